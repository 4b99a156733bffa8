//! Domain model for scheduled reminders.
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::birthday::Birthday;

/// Data carried by the reminder job and the alarm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderPayload {
    pub birthday_id: u64,
    pub name: String,
    pub relationship: String,
    pub reminder_days_before: u32,
    /// Local wall-clock time the reminder was registered for
    pub fire_time: NaiveDateTime,
}

impl ReminderPayload {
    pub fn for_birthday(birthday: &Birthday, fire_time: NaiveDateTime) -> Self {
        Self {
            birthday_id: birthday.id,
            name: birthday.name.clone(),
            relationship: birthday.relationship.clone(),
            reminder_days_before: birthday.reminder_days_before,
            fire_time,
        }
    }

    pub fn tag(&self) -> String {
        shared::Birthday::reminder_tag(self.birthday_id)
    }
}

/// Scheduling state of one birthday's reminder.
///
/// `Unscheduled -> Scheduled -> Fired -> Scheduled` while the record stays
/// enabled; delete or disable returns it to `Unscheduled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReminderState {
    #[default]
    Unscheduled,
    Scheduled { fire_time: NaiveDateTime },
    Fired { fire_time: NaiveDateTime },
}

impl ReminderState {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, ReminderState::Scheduled { .. })
    }
}

/// Reported by a delivery path after the notification went out
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderFired {
    pub birthday_id: u64,
    pub fire_time: NaiveDateTime,
}
