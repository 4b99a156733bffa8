//! # Domain Module
//!
//! Business logic for birthday reminders, independent of the REST layer and
//! of the storage backend.
//!
//! ## Module Organization
//!
//! - **calendar** / **lunar**: date arithmetic and the lunar calendar seam
//! - **recurrence**: next occurrence of a birthday and its reminder fire time
//! - **reminder_scheduler**: registers reminders on both delivery paths and
//!   renews them after they fire
//! - **reminder_worker**: renders and delivers a due reminder
//! - **birthday_service**: record CRUD with reminder side effects
//! - **system_event_service**: re-registration after reboots and clock changes
//!
//! ## Business Rules
//!
//! - A birthday falling today recurs today; one already past recurs next year
//! - Feb 29 falls on Feb 28 in non-leap years
//! - A reminder fires `reminder_days_before` days ahead at the configured time
//! - Each enabled birthday has at most one pending reminder per delivery path

pub mod birthday_service;
pub mod calendar;
pub mod clock;
pub mod commands;
pub mod lunar;
pub mod models;
pub mod recurrence;
pub mod reminder_scheduler;
pub mod reminder_worker;
pub mod system_event_service;

#[cfg(test)]
pub mod test_utils;

pub use birthday_service::{BirthdayService, BirthdayServiceError};
pub use clock::{Clock, SystemClock};
pub use lunar::{LunarCalendar, PassthroughLunarCalendar};
pub use reminder_scheduler::{ReminderScheduler, ReminderSettings};
pub use reminder_worker::ReminderWorker;
pub use system_event_service::SystemEventService;
