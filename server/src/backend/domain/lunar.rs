//! Lunar calendar support.
//!
//! Lunar birthdays are stored as lunar month/day and have to be resolved to a
//! Gregorian date for every year they recur in. The resolution sits behind the
//! [`LunarCalendar`] trait so a real solar-lunar converter can be plugged in.
//! [`PassthroughLunarCalendar`] reads the lunar month/day as Gregorian ones.

use chrono::NaiveDate;

use super::calendar::clamped_date;

const LUNAR_MONTHS: [&str; 12] = [
    "正月", "二月", "三月", "四月", "五月", "六月", "七月", "八月", "九月", "十月", "冬月", "腊月",
];

const LUNAR_DAYS: [&str; 30] = [
    "初一", "初二", "初三", "初四", "初五", "初六", "初七", "初八", "初九", "初十", "十一", "十二",
    "十三", "十四", "十五", "十六", "十七", "十八", "十九", "二十", "廿一", "廿二", "廿三", "廿四",
    "廿五", "廿六", "廿七", "廿八", "廿九", "三十",
];

/// Converts a lunar month/day into the Gregorian date it falls on in a given year
pub trait LunarCalendar: Send + Sync {
    /// Gregorian date of lunar `month`/`day` within Gregorian `year`.
    ///
    /// Returns `None` when the month/day cannot be placed in that year.
    fn to_solar(&self, year: i32, month: u32, day: u32) -> Option<NaiveDate>;
}

/// Treats lunar month/day as Gregorian month/day, clamping to the month length
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughLunarCalendar;

impl LunarCalendar for PassthroughLunarCalendar {
    fn to_solar(&self, year: i32, month: u32, day: u32) -> Option<NaiveDate> {
        clamped_date(year, month, day)
    }
}

/// Check whether a lunar month/day pair can exist
pub fn is_valid_lunar_date(month: u32, day: u32) -> bool {
    (1..=12).contains(&month) && (1..=30).contains(&day)
}

/// Traditional display name of a lunar date, e.g. "正月初一"
pub fn lunar_display_name(month: u32, day: u32) -> String {
    let month_name = LUNAR_MONTHS
        .get((month as usize).wrapping_sub(1))
        .copied()
        .unwrap_or(LUNAR_MONTHS[0]);
    let day_name = LUNAR_DAYS
        .get((day as usize).wrapping_sub(1))
        .copied()
        .unwrap_or(LUNAR_DAYS[0]);
    format!("{}{}", month_name, day_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_conversion() {
        let calendar = PassthroughLunarCalendar;
        assert_eq!(calendar.to_solar(2024, 8, 15), NaiveDate::from_ymd_opt(2024, 8, 15));
        // Lunar months have 30 days, the Gregorian February does not
        assert_eq!(calendar.to_solar(2025, 2, 30), NaiveDate::from_ymd_opt(2025, 2, 28));
        assert_eq!(calendar.to_solar(2025, 13, 1), None);
    }

    #[test]
    fn test_is_valid_lunar_date() {
        assert!(is_valid_lunar_date(1, 1));
        assert!(is_valid_lunar_date(12, 30));
        assert!(!is_valid_lunar_date(0, 1));
        assert!(!is_valid_lunar_date(13, 1));
        assert!(!is_valid_lunar_date(1, 31));
        assert!(!is_valid_lunar_date(1, 0));
    }

    #[test]
    fn test_lunar_display_name() {
        assert_eq!(lunar_display_name(1, 1), "正月初一");
        assert_eq!(lunar_display_name(8, 15), "八月十五");
        assert_eq!(lunar_display_name(12, 30), "腊月三十");
        // Out of range parts fall back to the first month/day
        assert_eq!(lunar_display_name(0, 31), "正月初一");
    }
}
