//! Calendar arithmetic shared by the recurrence calculator and validation.
//!
//! Everything here is plain Gregorian math. Month/day pairs that do not exist
//! in a given year (Feb 29 outside leap years, lunar day 30 routed through the
//! passthrough converter) are clamped to the last day of the month.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};

/// Check if a year is a leap year
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Number of days in the given month, 0 for an invalid month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Build a date in `year`, clamping `day` to the month's length.
///
/// Returns `None` only for an invalid month or a year chrono cannot represent.
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let last_day = days_in_month(year, month);
    if last_day == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day.clamp(1, last_day))
}

/// Shift a timestamp by whole calendar years; Feb 29 lands on Feb 28.
pub fn add_years(timestamp: NaiveDateTime, years: u32) -> Option<NaiveDateTime> {
    timestamp.checked_add_months(Months::new(years * 12))
}

/// Whole days from `from` to `to` (negative if `to` is earlier)
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

/// Format a date the way it travels over the API and in storage
pub fn format_iso_date(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2025, 1), 31);
        assert_eq!(days_in_month(2025, 2), 28); // February (non-leap)
        assert_eq!(days_in_month(2024, 2), 29); // February (leap year)
        assert_eq!(days_in_month(2025, 4), 30);
        assert_eq!(days_in_month(2025, 13), 0);
    }

    #[test]
    fn test_is_leap_year() {
        assert!(!is_leap_year(2025)); // Regular year
        assert!(is_leap_year(2024)); // Divisible by 4
        assert!(!is_leap_year(1900)); // Divisible by 100 but not 400
        assert!(is_leap_year(2000)); // Divisible by 400
    }

    #[test]
    fn test_clamped_date() {
        assert_eq!(clamped_date(2024, 2, 29), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(clamped_date(2025, 2, 29), NaiveDate::from_ymd_opt(2025, 2, 28));
        assert_eq!(clamped_date(2025, 4, 31), NaiveDate::from_ymd_opt(2025, 4, 30));
        assert_eq!(clamped_date(2025, 0, 1), None);
    }

    #[test]
    fn test_add_years_clamps_leap_day() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let leap = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap().and_time(nine);
        let shifted = add_years(leap, 1).unwrap();
        assert_eq!(shifted, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap().and_time(nine));

        let regular = NaiveDate::from_ymd_opt(2024, 12, 24).unwrap().and_time(nine);
        assert_eq!(
            add_years(regular, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 24).unwrap().and_time(nine)
        );
    }

    #[test]
    fn test_days_between_and_format() {
        let a = NaiveDate::from_ymd_opt(2024, 12, 20).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();
        assert_eq!(days_between(a, b), 5);
        assert_eq!(days_between(b, a), -5);
        assert_eq!(format_iso_date(a), "2024-12-20");
    }
}
