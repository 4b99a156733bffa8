use serde::{Deserialize, Serialize};
use std::fmt;

/// Birthday record as exchanged over the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Birthday {
    /// Assigned by the data store on creation
    pub id: u64,
    pub name: String,
    /// ISO 8601 date format (YYYY-MM-DD), in the calendar selected by `is_lunar`
    pub date: String,
    pub is_lunar: bool,
    /// Number of days before the birthday to send the reminder
    pub reminder_days_before: u32,
    pub enabled: bool,
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub sort_order: i32,
    pub created_at: String, // RFC 3339 timestamp
    /// Traditional name of a lunar date, e.g. "八月十五"; absent for Gregorian dates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lunar_label: Option<String>,
}

/// Request for creating a new birthday
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateBirthdayRequest {
    pub name: String,
    pub date: String, // ISO 8601 date format (YYYY-MM-DD)
    #[serde(default)]
    pub is_lunar: bool,
    #[serde(default = "default_reminder_days_before")]
    pub reminder_days_before: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub notes: String,
}

fn default_reminder_days_before() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

/// Request for updating an existing birthday; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateBirthdayRequest {
    pub name: Option<String>,
    pub date: Option<String>,
    pub is_lunar: Option<bool>,
    pub reminder_days_before: Option<u32>,
    pub enabled: Option<bool>,
    pub relationship: Option<String>,
    pub notes: Option<String>,
}

/// Response after creating or updating a birthday
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BirthdayResponse {
    pub birthday: Birthday,
    pub success_message: String,
}

/// Response containing a list of birthdays in display order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BirthdayListResponse {
    pub birthdays: Vec<Birthday>,
}

/// Request for manual reordering: ids in their new display order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReorderBirthdaysRequest {
    pub birthday_ids: Vec<u64>,
}

/// A birthday together with its next occurrence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpcomingBirthday {
    pub birthday: Birthday,
    pub next_occurrence: String, // YYYY-MM-DD
    pub days_until: u32,
    /// Age the person turns on the next occurrence
    pub turning_age: i32,
    pub within_reminder_window: bool,
}

/// Upcoming birthdays sorted by days until the next occurrence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpcomingBirthdaysResponse {
    pub today: String,
    pub upcoming: Vec<UpcomingBirthday>,
}

/// Scheduling state of a single reminder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReminderStatus {
    Unscheduled,
    Scheduled {
        fire_time: String, // local time, YYYY-MM-DDTHH:MM:SS
        job_pending: bool,
        alarm_pending: bool,
    },
    Fired {
        fire_time: String,
    },
}

/// Response for a reminder status lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReminderStatusResponse {
    pub birthday_id: u64,
    pub status: ReminderStatus,
}

/// Outcome of rescheduling every enabled birthday
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RescheduleResponse {
    pub scheduled: usize,
    pub failed: usize,
}

/// Outcome of the daily consistency check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsistencyCheckResponse {
    pub checked: usize,
    pub repaired: usize,
}

/// Operating system style events that invalidate registered reminders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemEventKind {
    BootCompleted,
    PackageReplaced,
    ClockChanged,
    TimezoneChanged,
    QuickBootPowerOn,
}

impl fmt::Display for SystemEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemEventKind::BootCompleted => write!(f, "boot completed"),
            SystemEventKind::PackageReplaced => write!(f, "package replaced"),
            SystemEventKind::ClockChanged => write!(f, "clock changed"),
            SystemEventKind::TimezoneChanged => write!(f, "timezone changed"),
            SystemEventKind::QuickBootPowerOn => write!(f, "quick boot power on"),
        }
    }
}

/// Request carrying a system event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemEventRequest {
    pub event: SystemEventKind,
}

/// Request for sending a test notification right away
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestNotificationRequest {
    pub name: String,
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub days_before: u32,
}

/// A notification as shown to the user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub dedupe_key: String,
    pub delivered_at: String, // RFC 3339 timestamp
}

/// Notifications currently shown, one per dedupe key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationListResponse {
    pub permission_granted: bool,
    pub notifications: Vec<Notification>,
}

/// Grant or revoke permission to show notifications
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationPermissionRequest {
    pub granted: bool,
}

impl Birthday {
    /// Tag under which the reminder job and alarm for a birthday are registered
    pub fn reminder_tag(id: u64) -> String {
        format!("birthday_reminder_{}", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reminder_tag() {
        assert_eq!(Birthday::reminder_tag(42), "birthday_reminder_42");
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateBirthdayRequest =
            serde_json::from_str(r#"{"name":"Mom","date":"1960-03-08"}"#).unwrap();

        assert_eq!(request.reminder_days_before, 1);
        assert!(request.enabled);
        assert!(!request.is_lunar);
        assert!(request.relationship.is_empty());
    }

    #[test]
    fn test_reminder_status_serialization() {
        let status = ReminderStatus::Scheduled {
            fire_time: "2024-12-24T09:00:00".to_string(),
            job_pending: true,
            alarm_pending: true,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "scheduled");
        assert_eq!(json["fire_time"], "2024-12-24T09:00:00");
    }

    #[test]
    fn test_system_event_kind_wire_names() {
        let request: SystemEventRequest =
            serde_json::from_str(r#"{"event":"clock_changed"}"#).unwrap();
        assert_eq!(request.event, SystemEventKind::ClockChanged);
        assert_eq!(request.event.to_string(), "clock changed");
    }
}
