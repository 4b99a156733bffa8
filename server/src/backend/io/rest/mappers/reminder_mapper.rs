use chrono::NaiveDateTime;
use shared::{Notification, ReminderStatus};

use crate::backend::domain::models::reminder::ReminderState;
use crate::backend::io::notification::DeliveredNotification;

const LOCAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Mapper for reminder state and delivered notifications.
pub struct ReminderMapper;

impl ReminderMapper {
    pub fn format_fire_time(fire_time: NaiveDateTime) -> String {
        fire_time.format(LOCAL_TIMESTAMP_FORMAT).to_string()
    }

    pub fn to_status(state: ReminderState, job_pending: bool, alarm_pending: bool) -> ReminderStatus {
        match state {
            ReminderState::Unscheduled => ReminderStatus::Unscheduled,
            ReminderState::Scheduled { fire_time } => ReminderStatus::Scheduled {
                fire_time: Self::format_fire_time(fire_time),
                job_pending,
                alarm_pending,
            },
            ReminderState::Fired { fire_time } => ReminderStatus::Fired {
                fire_time: Self::format_fire_time(fire_time),
            },
        }
    }

    pub fn to_notification_dto(delivered: DeliveredNotification) -> Notification {
        Notification {
            title: delivered.message.title,
            body: delivered.message.body,
            dedupe_key: delivered.message.dedupe_key,
            delivered_at: delivered.delivered_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_to_status() {
        let fire_time = NaiveDate::from_ymd_opt(2024, 12, 24)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();

        assert_eq!(
            ReminderMapper::to_status(ReminderState::Unscheduled, false, false),
            ReminderStatus::Unscheduled
        );
        assert_eq!(
            ReminderMapper::to_status(ReminderState::Scheduled { fire_time }, true, false),
            ReminderStatus::Scheduled {
                fire_time: "2024-12-24T09:00:00".to_string(),
                job_pending: true,
                alarm_pending: false,
            }
        );
    }
}
