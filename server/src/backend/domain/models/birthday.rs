//! Domain model for a birthday record.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::domain::calendar::days_in_month;
use crate::backend::domain::lunar::is_valid_lunar_date;

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_REMINDER_DAYS_BEFORE: u32 = 365;
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;

/// Calendar-agnostic birth date; `is_lunar` selects the calendar of month/day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub is_lunar: bool,
}

impl CalendarDate {
    pub fn gregorian(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day, is_lunar: false }
    }

    pub fn lunar(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day, is_lunar: true }
    }

    /// Parse a "YYYY-MM-DD" string and validate it for the selected calendar
    pub fn parse(date: &str, is_lunar: bool) -> Result<Self, BirthdayValidationError> {
        if date.len() != 10 {
            return Err(BirthdayValidationError::InvalidDateFormat);
        }

        let parts: Vec<&str> = date.split('-').collect();
        if parts.len() != 3 || parts[0].len() != 4 || parts[1].len() != 2 || parts[2].len() != 2 {
            return Err(BirthdayValidationError::InvalidDateFormat);
        }

        let year: i32 = parts[0]
            .parse()
            .map_err(|_| BirthdayValidationError::InvalidDateFormat)?;
        let month: u32 = parts[1]
            .parse()
            .map_err(|_| BirthdayValidationError::InvalidDateFormat)?;
        let day: u32 = parts[2]
            .parse()
            .map_err(|_| BirthdayValidationError::InvalidDateFormat)?;

        let date = Self { year, month, day, is_lunar };
        date.validate()?;
        Ok(date)
    }

    /// Check the date exists in its calendar
    pub fn validate(&self) -> Result<(), BirthdayValidationError> {
        if self.year < MIN_YEAR || self.year > MAX_YEAR {
            return Err(BirthdayValidationError::YearOutOfRange);
        }

        if !(1..=12).contains(&self.month) {
            return Err(BirthdayValidationError::InvalidMonth);
        }

        let day_is_valid = if self.is_lunar {
            is_valid_lunar_date(self.month, self.day)
        } else {
            self.day >= 1 && self.day <= days_in_month(self.year, self.month)
        };

        if !day_is_valid {
            return Err(BirthdayValidationError::InvalidDay {
                month: self.month,
                day: self.day,
            });
        }

        Ok(())
    }

    /// "YYYY-MM-DD" in the record's own calendar
    pub fn format(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Birthday {
    pub id: u64,
    pub name: String,
    pub calendar_date: CalendarDate,
    pub reminder_days_before: u32,
    pub enabled: bool,
    pub relationship: String,
    pub notes: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl Birthday {
    /// Age the person reaches in the given year
    pub fn age_in(&self, year: i32) -> i32 {
        year - self.calendar_date.year
    }

    /// Whether a birthday `days_until` away should already be reminded of
    pub fn is_within_reminder_window(&self, days_until: u32) -> bool {
        self.enabled && days_until <= self.reminder_days_before
    }

    pub fn reminder_tag(&self) -> String {
        shared::Birthday::reminder_tag(self.id)
    }

    /// Whether switching from `self` to `updated` invalidates the registered reminder
    pub fn schedule_differs(&self, updated: &Birthday) -> bool {
        self.enabled != updated.enabled
            || self.calendar_date != updated.calendar_date
            || self.reminder_days_before != updated.reminder_days_before
            || self.name != updated.name
            || self.relationship != updated.relationship
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BirthdayValidationError {
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Name cannot exceed {} characters", MAX_NAME_LENGTH)]
    NameTooLong,
    #[error("Date must be in YYYY-MM-DD format")]
    InvalidDateFormat,
    #[error("Year must be between {} and {}", MIN_YEAR, MAX_YEAR)]
    YearOutOfRange,
    #[error("Month must be between 1 and 12")]
    InvalidMonth,
    #[error("Invalid day {day} for month {month}")]
    InvalidDay { month: u32, day: u32 },
    #[error("Reminder cannot be more than {} days before the birthday", MAX_REMINDER_DAYS_BEFORE)]
    ReminderTooEarly,
}

/// Trim and check a display name
pub fn validate_name(name: &str) -> Result<String, BirthdayValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(BirthdayValidationError::EmptyName);
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(BirthdayValidationError::NameTooLong);
    }
    Ok(trimmed.to_string())
}

pub fn validate_reminder_days_before(days: u32) -> Result<u32, BirthdayValidationError> {
    if days > MAX_REMINDER_DAYS_BEFORE {
        return Err(BirthdayValidationError::ReminderTooEarly);
    }
    Ok(days)
}
