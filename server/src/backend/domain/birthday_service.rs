//! Birthday record management.
//!
//! Every mutation keeps the reminder registrations in step with the stored
//! record: create schedules, update reschedules when the reminder is affected,
//! delete cancels. Scheduling problems are logged and never fail the data
//! operation; the daily consistency check picks them up.

use anyhow::Result;
use chrono::{Datelike, Utc};
use log::{info, warn};
use std::collections::HashSet;
use std::sync::Arc;

use crate::backend::domain::clock::Clock;
use crate::backend::domain::commands::birthday::{
    BirthdayResult, CreateBirthdayCommand, ReorderBirthdaysCommand, UpcomingBirthday,
    UpcomingBirthdaysResult, UpdateBirthdayCommand,
};
use crate::backend::domain::lunar::LunarCalendar;
use crate::backend::domain::models::birthday::{
    validate_name, validate_reminder_days_before, Birthday, CalendarDate,
};
use crate::backend::domain::recurrence::next_occurrence;
use crate::backend::domain::reminder_scheduler::ReminderScheduler;
use crate::backend::storage::BirthdayStorage;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BirthdayServiceError {
    #[error("Birthday {0} not found")]
    NotFound(u64),
    #[error("Birthday {0} appears more than once in the new order")]
    DuplicateInOrder(u64),
}

#[derive(Clone)]
pub struct BirthdayService {
    storage: Arc<dyn BirthdayStorage>,
    scheduler: ReminderScheduler,
    clock: Arc<dyn Clock>,
    lunar: Arc<dyn LunarCalendar>,
}

impl BirthdayService {
    pub fn new(
        storage: Arc<dyn BirthdayStorage>,
        scheduler: ReminderScheduler,
        clock: Arc<dyn Clock>,
        lunar: Arc<dyn LunarCalendar>,
    ) -> Self {
        Self {
            storage,
            scheduler,
            clock,
            lunar,
        }
    }

    /// Create a new birthday and schedule its reminder
    pub async fn create_birthday(&self, command: CreateBirthdayCommand) -> Result<BirthdayResult> {
        info!("Creating birthday: name={}, date={}", command.name, command.date);

        let name = validate_name(&command.name)?;
        let calendar_date = CalendarDate::parse(&command.date, command.is_lunar)?;
        let reminder_days_before = validate_reminder_days_before(command.reminder_days_before)?;

        // New records go to the end of the manual order
        let sort_order = self
            .storage
            .list_birthdays()
            .await?
            .iter()
            .map(|b| b.sort_order + 1)
            .max()
            .unwrap_or(0);

        let birthday = Birthday {
            id: 0,
            name,
            calendar_date,
            reminder_days_before,
            enabled: command.enabled,
            relationship: command.relationship.trim().to_string(),
            notes: command.notes,
            sort_order,
            created_at: Utc::now(),
        };

        let stored = self.storage.insert_birthday(birthday).await?;
        if stored.enabled {
            self.sync_reminder(&stored).await;
        }

        info!("Created birthday: {} with ID: {}", stored.name, stored.id);
        Ok(BirthdayResult {
            birthday: stored,
            success_message: "Birthday created successfully".to_string(),
        })
    }

    pub async fn get_birthday(&self, id: u64) -> Result<Birthday> {
        self.storage
            .get_birthday(id)
            .await?
            .ok_or_else(|| BirthdayServiceError::NotFound(id).into())
    }

    pub async fn list_birthdays(&self) -> Result<Vec<Birthday>> {
        self.storage.list_birthdays().await
    }

    /// Apply a partial update; the reminder is rescheduled only when it changes
    pub async fn update_birthday(&self, command: UpdateBirthdayCommand) -> Result<BirthdayResult> {
        info!("Updating birthday: {}", command.id);

        let existing = self.get_birthday(command.id).await?;
        let mut updated = existing.clone();

        if let Some(name) = &command.name {
            updated.name = validate_name(name)?;
        }
        if command.date.is_some() || command.is_lunar.is_some() {
            let date = command
                .date
                .clone()
                .unwrap_or_else(|| existing.calendar_date.format());
            let is_lunar = command.is_lunar.unwrap_or(existing.calendar_date.is_lunar);
            updated.calendar_date = CalendarDate::parse(&date, is_lunar)?;
        }
        if let Some(days) = command.reminder_days_before {
            updated.reminder_days_before = validate_reminder_days_before(days)?;
        }
        if let Some(enabled) = command.enabled {
            updated.enabled = enabled;
        }
        if let Some(relationship) = &command.relationship {
            updated.relationship = relationship.trim().to_string();
        }
        if let Some(notes) = command.notes {
            updated.notes = notes;
        }

        if !self.storage.update_birthday(&updated).await? {
            return Err(BirthdayServiceError::NotFound(command.id).into());
        }

        if existing.schedule_differs(&updated) {
            self.sync_reminder(&updated).await;
        }

        Ok(BirthdayResult {
            birthday: updated,
            success_message: "Birthday updated successfully".to_string(),
        })
    }

    /// Delete a birthday and cancel its reminder
    pub async fn delete_birthday(&self, id: u64) -> Result<()> {
        info!("Deleting birthday: {}", id);

        if !self.storage.delete_birthday(id).await? {
            return Err(BirthdayServiceError::NotFound(id).into());
        }
        self.scheduler.cancel_reminder(id).await;
        Ok(())
    }

    /// Assign sort orders by position in `birthday_ids`
    pub async fn reorder_birthdays(&self, command: ReorderBirthdaysCommand) -> Result<Vec<Birthday>> {
        let known: HashSet<u64> = self
            .storage
            .list_birthdays()
            .await?
            .iter()
            .map(|b| b.id)
            .collect();

        let mut seen = HashSet::new();
        for id in &command.birthday_ids {
            if !known.contains(id) {
                return Err(BirthdayServiceError::NotFound(*id).into());
            }
            if !seen.insert(*id) {
                return Err(BirthdayServiceError::DuplicateInOrder(*id).into());
            }
        }

        self.storage.update_sort_orders(&command.birthday_ids).await?;
        info!("Reordered {} birthdays", command.birthday_ids.len());
        self.storage.list_birthdays().await
    }

    /// Birthdays ordered by how soon they come around, nearest first
    pub async fn upcoming_birthdays(&self, limit: Option<usize>) -> Result<UpcomingBirthdaysResult> {
        let today = self.clock.now().date();

        let mut upcoming = Vec::new();
        for birthday in self.storage.list_birthdays().await? {
            let recurrence = match next_occurrence(&birthday.calendar_date, today, self.lunar.as_ref()) {
                Ok(recurrence) => recurrence,
                Err(e) => {
                    warn!("Leaving {} out of upcoming birthdays: {}", birthday.id, e);
                    continue;
                }
            };
            upcoming.push(UpcomingBirthday {
                turning_age: birthday.age_in(recurrence.next_occurrence.year()),
                within_reminder_window: birthday.is_within_reminder_window(recurrence.days_until),
                recurrence,
                birthday,
            });
        }

        upcoming.sort_by(|a, b| {
            a.recurrence
                .days_until
                .cmp(&b.recurrence.days_until)
                .then_with(|| a.birthday.name.cmp(&b.birthday.name))
        });
        if let Some(limit) = limit {
            upcoming.truncate(limit);
        }

        Ok(UpcomingBirthdaysResult { today, upcoming })
    }

    async fn sync_reminder(&self, birthday: &Birthday) {
        if let Err(e) = self.scheduler.schedule_reminder(birthday).await {
            warn!(
                "Saved birthday {} but could not schedule its reminder: {}",
                birthday.id, e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::lunar::PassthroughLunarCalendar;
    use crate::backend::domain::models::birthday::BirthdayValidationError;
    use crate::backend::domain::models::reminder::ReminderState;
    use crate::backend::domain::reminder_scheduler::ReminderSettings;
    use crate::backend::domain::test_utils::{FixedClock, RecordingAlarmClock, RecordingJobQueue};
    use crate::backend::storage::csv::test_utils::TestEnvironment;
    use chrono::NaiveDate;

    struct Harness {
        _env: TestEnvironment,
        jobs: Arc<RecordingJobQueue>,
        alarms: Arc<RecordingAlarmClock>,
        scheduler: ReminderScheduler,
        service: BirthdayService,
    }

    fn harness() -> Harness {
        let env = TestEnvironment::new().unwrap();
        let storage: Arc<dyn BirthdayStorage> = env.repository();
        let jobs = Arc::new(RecordingJobQueue::default());
        let alarms = Arc::new(RecordingAlarmClock::default());
        let clock = Arc::new(FixedClock::at(2024, 12, 20, 10, 0));
        let lunar = Arc::new(PassthroughLunarCalendar);
        let scheduler = ReminderScheduler::new(
            storage.clone(),
            jobs.clone(),
            alarms.clone(),
            clock.clone(),
            lunar.clone(),
            ReminderSettings::default(),
        );
        let service = BirthdayService::new(storage, scheduler.clone(), clock, lunar);
        Harness {
            _env: env,
            jobs,
            alarms,
            scheduler,
            service,
        }
    }

    fn create_command(name: &str, date: &str) -> CreateBirthdayCommand {
        CreateBirthdayCommand {
            name: name.to_string(),
            date: date.to_string(),
            is_lunar: false,
            reminder_days_before: 1,
            enabled: true,
            relationship: "friend".to_string(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_schedules_reminder() {
        let h = harness();
        let result = h.service.create_birthday(create_command("  Noel ", "1990-12-25")).await.unwrap();

        assert_eq!(result.birthday.id, 1);
        assert_eq!(result.birthday.name, "Noel");
        assert!(h.jobs.job("birthday_reminder_1").is_some());
        assert!(h.alarms.alarm_time("birthday_reminder_1").is_some());
    }

    #[tokio::test]
    async fn test_create_disabled_does_not_schedule() {
        let h = harness();
        let mut command = create_command("Noel", "1990-12-25");
        command.enabled = false;
        h.service.create_birthday(command).await.unwrap();

        assert_eq!(h.jobs.pending_count(), 0);
        assert_eq!(h.alarms.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let h = harness();

        let err = h.service.create_birthday(create_command("   ", "1990-12-25")).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<BirthdayValidationError>(),
            Some(&BirthdayValidationError::EmptyName)
        );

        let err = h.service.create_birthday(create_command("Noel", "1990-02-30")).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<BirthdayValidationError>(),
            Some(&BirthdayValidationError::InvalidDay { month: 2, day: 30 })
        );

        assert!(h.service.list_birthdays().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_disable_removes_registrations() {
        let h = harness();
        h.service.create_birthday(create_command("Noel", "1990-12-25")).await.unwrap();

        let result = h
            .service
            .update_birthday(UpdateBirthdayCommand {
                id: 1,
                enabled: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(!result.birthday.enabled);
        assert_eq!(h.jobs.pending_count(), 0);
        assert_eq!(h.alarms.pending_count(), 0);
        assert_eq!(h.jobs.enqueue_count(), 1);
        assert_eq!(h.scheduler.reminder_state(1), ReminderState::Unscheduled);
    }

    #[tokio::test]
    async fn test_update_date_reschedules() {
        let h = harness();
        h.service.create_birthday(create_command("Noel", "1990-12-25")).await.unwrap();

        h.service
            .update_birthday(UpdateBirthdayCommand {
                id: 1,
                date: Some("1990-12-31".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let job = h.jobs.job("birthday_reminder_1").unwrap();
        assert_eq!(job.payload.fire_time.date(), NaiveDate::from_ymd_opt(2024, 12, 30).unwrap());
    }

    #[tokio::test]
    async fn test_notes_only_update_keeps_registration() {
        let h = harness();
        h.service.create_birthday(create_command("Noel", "1990-12-25")).await.unwrap();

        h.service
            .update_birthday(UpdateBirthdayCommand {
                id: 1,
                notes: Some("likes jazz".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(h.jobs.enqueue_count(), 1);
        assert_eq!(h.service.get_birthday(1).await.unwrap().notes, "likes jazz");
    }

    #[tokio::test]
    async fn test_delete_cancels_and_reports_missing() {
        let h = harness();
        h.service.create_birthday(create_command("Noel", "1990-12-25")).await.unwrap();

        h.service.delete_birthday(1).await.unwrap();
        assert_eq!(h.jobs.pending_count(), 0);
        assert_eq!(h.alarms.pending_count(), 0);

        let err = h.service.delete_birthday(1).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<BirthdayServiceError>(),
            Some(&BirthdayServiceError::NotFound(1))
        );
    }

    #[tokio::test]
    async fn test_reorder() {
        let h = harness();
        h.service.create_birthday(create_command("Alice", "1990-03-14")).await.unwrap();
        h.service.create_birthday(create_command("Bob", "1990-07-01")).await.unwrap();
        h.service.create_birthday(create_command("Cara", "1990-01-02")).await.unwrap();

        let reordered = h
            .service
            .reorder_birthdays(ReorderBirthdaysCommand { birthday_ids: vec![2, 3, 1] })
            .await
            .unwrap();
        let names: Vec<&str> = reordered.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Cara", "Alice"]);
        assert_eq!(reordered[0].sort_order, 0);
        assert_eq!(reordered[2].sort_order, 2);

        let err = h
            .service
            .reorder_birthdays(ReorderBirthdaysCommand { birthday_ids: vec![1, 1] })
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<BirthdayServiceError>(),
            Some(&BirthdayServiceError::DuplicateInOrder(1))
        );
    }

    #[tokio::test]
    async fn test_upcoming_sorted_by_days_until() {
        let h = harness();
        h.service.create_birthday(create_command("Alice", "1990-03-14")).await.unwrap();
        h.service.create_birthday(create_command("Noel", "1990-12-21")).await.unwrap();
        h.service.create_birthday(create_command("Eve", "1985-12-20")).await.unwrap();

        let result = h.service.upcoming_birthdays(None).await.unwrap();
        assert_eq!(result.today, NaiveDate::from_ymd_opt(2024, 12, 20).unwrap());

        let names: Vec<&str> = result.upcoming.iter().map(|u| u.birthday.name.as_str()).collect();
        assert_eq!(names, vec!["Eve", "Noel", "Alice"]);

        let eve = &result.upcoming[0];
        assert_eq!(eve.recurrence.days_until, 0);
        assert_eq!(eve.turning_age, 39);
        assert!(eve.within_reminder_window);

        let noel = &result.upcoming[1];
        assert_eq!(noel.recurrence.days_until, 1);
        assert!(noel.within_reminder_window);

        let alice = &result.upcoming[2];
        assert_eq!(alice.recurrence.next_occurrence, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert!(!alice.within_reminder_window);

        assert_eq!(h.service.upcoming_birthdays(Some(1)).await.unwrap().upcoming.len(), 1);
    }
}
