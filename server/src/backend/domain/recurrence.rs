//! Recurrence calculation for annual birthdays.
//!
//! Pure functions: given a birth date and "today" they produce the next date
//! the birthday falls on and, from that, the wall-clock time its reminder
//! should fire. Today is inclusive, so a birthday falling today recurs today.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};

use super::calendar::{add_years, clamped_date, days_between};
use super::lunar::LunarCalendar;
use super::models::birthday::{Birthday, CalendarDate};

/// Next occurrence of a birthday relative to a reference day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recurrence {
    pub next_occurrence: NaiveDate,
    /// Days from today to `next_occurrence`, 0 when the birthday is today
    pub days_until: u32,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecurrenceError {
    #[error("Month {month} day {day} cannot be placed in year {year}")]
    UnresolvableDate { year: i32, month: u32, day: u32 },
    #[error("Reminder time for {0} is out of range")]
    FireTimeOutOfRange(NaiveDate),
}

/// Gregorian date the birthday falls on in `year`
pub fn resolve_in_year(
    date: &CalendarDate,
    year: i32,
    lunar: &dyn LunarCalendar,
) -> Result<NaiveDate, RecurrenceError> {
    let resolved = if date.is_lunar {
        lunar.to_solar(year, date.month, date.day)
    } else {
        clamped_date(year, date.month, date.day)
    };

    resolved.ok_or(RecurrenceError::UnresolvableDate {
        year,
        month: date.month,
        day: date.day,
    })
}

/// Next date on or after `today` the birthday recurs on
pub fn next_occurrence(
    date: &CalendarDate,
    today: NaiveDate,
    lunar: &dyn LunarCalendar,
) -> Result<Recurrence, RecurrenceError> {
    let mut candidate = resolve_in_year(date, today.year(), lunar)?;
    if candidate < today {
        candidate = resolve_in_year(date, today.year() + 1, lunar)?;
    }

    // A converter placing next year's date before today is a defect; never
    // report a negative distance.
    let days_until = u32::try_from(days_between(today, candidate)).map_err(|_| {
        RecurrenceError::UnresolvableDate {
            year: today.year() + 1,
            month: date.month,
            day: date.day,
        }
    })?;

    Ok(Recurrence {
        next_occurrence: candidate,
        days_until,
    })
}

/// Reminder time for an occurrence, before any past-time adjustment
pub fn reminder_fire_time(
    recurrence: &Recurrence,
    reminder_days_before: u32,
    reminder_time: NaiveTime,
) -> Result<NaiveDateTime, RecurrenceError> {
    recurrence
        .next_occurrence
        .checked_sub_days(Days::new(u64::from(reminder_days_before)))
        .map(|day| day.and_time(reminder_time))
        .ok_or(RecurrenceError::FireTimeOutOfRange(recurrence.next_occurrence))
}

/// Reminder time for the next occurrence without moving past times forward.
///
/// This is what the daily consistency check compares against "now".
pub fn raw_fire_time(
    birthday: &Birthday,
    now: NaiveDateTime,
    reminder_time: NaiveTime,
    lunar: &dyn LunarCalendar,
) -> Result<NaiveDateTime, RecurrenceError> {
    let recurrence = next_occurrence(&birthday.calendar_date, now.date(), lunar)?;
    reminder_fire_time(&recurrence, birthday.reminder_days_before, reminder_time)
}

/// Time the reminder should be registered for, never in the past.
///
/// When the reminder window of this cycle has already opened the fire time
/// moves one calendar year forward.
pub fn next_fire_time(
    birthday: &Birthday,
    now: NaiveDateTime,
    reminder_time: NaiveTime,
    lunar: &dyn LunarCalendar,
) -> Result<NaiveDateTime, RecurrenceError> {
    let fire_time = raw_fire_time(birthday, now, reminder_time, lunar)?;
    if fire_time < now {
        add_years(fire_time, 1).ok_or(RecurrenceError::FireTimeOutOfRange(fire_time.date()))
    } else {
        Ok(fire_time)
    }
}
