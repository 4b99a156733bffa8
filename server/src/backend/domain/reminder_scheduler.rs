//! # Reminder Scheduler
//!
//! Keeps exactly one pending reminder per enabled birthday, registered on two
//! independent delivery paths: a deferred job (retried with backoff) and a
//! wall-clock alarm. Both are addressed by the tag `birthday_reminder_{id}`
//! so either can be cancelled or replaced.
//!
//! ## Reminder lifecycle
//!
//! ```text
//! Unscheduled -> Scheduled(fire_time) -> Fired -> Scheduled(next year)
//!      ^                  |
//!      +---- delete / disable
//! ```
//!
//! Renewal is driven by [`ReminderFired`] events coming back from the worker;
//! an event that does not match the current `Scheduled` fire time is stale
//! (usually the second delivery path) and is ignored.
//!
//! Schedule and cancel for one birthday serialize on a per-id async lock held
//! across "reload record, cancel old, register new". The record is always
//! re-read from the data store under that lock, so a copy read earlier can
//! never re-register a reminder that was disabled or deleted meanwhile.
//! Different birthdays proceed concurrently.

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, NaiveTime};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::OwnedMutexGuard;

use crate::backend::domain::clock::Clock;
use crate::backend::domain::lunar::LunarCalendar;
use crate::backend::domain::models::birthday::Birthday;
use crate::backend::domain::models::reminder::{ReminderFired, ReminderPayload, ReminderState};
use crate::backend::domain::recurrence::{next_fire_time, raw_fire_time, RecurrenceError};
use crate::backend::io::alarm::AlarmClock;
use crate::backend::io::job_queue::{BackoffPolicy, JobQueue, ReminderJob};
use crate::backend::storage::BirthdayStorage;

/// When reminders fire and how failed deliveries are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSettings {
    pub reminder_time: NaiveTime,
    pub backoff: BackoffPolicy,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            reminder_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            backoff: BackoffPolicy::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error(transparent)]
    Recurrence(#[from] RecurrenceError),
    #[error("Neither the job queue nor the alarm clock accepted reminder {tag}")]
    RegistrationFailed { tag: String },
    #[error("Failed to reload birthday {id}")]
    Storage {
        id: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub scheduled: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub checked: usize,
    pub repaired: usize,
}

type IdLock = Arc<tokio::sync::Mutex<()>>;
type LockTable = Arc<Mutex<HashMap<u64, IdLock>>>;

/// Held while one birthday's registrations change; the lock entry is dropped
/// from the table once nobody holds or waits for it
struct IdGuard {
    birthday_id: u64,
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockTable,
}

impl Drop for IdGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.birthday_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.birthday_id);
        }
    }
}

#[derive(Clone)]
pub struct ReminderScheduler {
    storage: Arc<dyn BirthdayStorage>,
    job_queue: Arc<dyn JobQueue>,
    alarm_clock: Arc<dyn AlarmClock>,
    clock: Arc<dyn Clock>,
    lunar: Arc<dyn LunarCalendar>,
    settings: ReminderSettings,
    locks: LockTable,
    states: Arc<Mutex<HashMap<u64, ReminderState>>>,
}

impl ReminderScheduler {
    pub fn new(
        storage: Arc<dyn BirthdayStorage>,
        job_queue: Arc<dyn JobQueue>,
        alarm_clock: Arc<dyn AlarmClock>,
        clock: Arc<dyn Clock>,
        lunar: Arc<dyn LunarCalendar>,
        settings: ReminderSettings,
    ) -> Self {
        Self {
            storage,
            job_queue,
            alarm_clock,
            clock,
            lunar,
            settings,
            locks: Arc::new(Mutex::new(HashMap::new())),
            states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Replace any registration for this birthday with a fresh one.
    ///
    /// The stored record is authoritative: `birthday` only names the id, and
    /// the reminder follows whatever the data store holds once the id lock is
    /// taken. Returns the fire time, or `None` when the birthday is disabled
    /// or gone.
    pub async fn schedule_reminder(&self, birthday: &Birthday) -> Result<Option<NaiveDateTime>, SchedulingError> {
        let _guard = self.lock_id(birthday.id).await;
        self.sync_locked(birthday.id, self.clock.now()).await
    }

    /// Remove the job and the alarm for a birthday; a no-op when neither exists
    pub async fn cancel_reminder(&self, birthday_id: u64) {
        let _guard = self.lock_id(birthday_id).await;
        self.cancel_locked(birthday_id).await;
        self.set_state(birthday_id, ReminderState::Unscheduled);
    }

    /// Schedule every enabled birthday; used at start-up and after system events
    pub async fn schedule_all_reminders(&self) -> Result<ScheduleSummary> {
        let birthdays = self
            .storage
            .list_enabled()
            .await
            .context("Failed to load birthdays for scheduling")?;

        let mut summary = ScheduleSummary::default();
        for birthday in &birthdays {
            match self.schedule_reminder(birthday).await {
                Ok(Some(_)) => summary.scheduled += 1,
                Ok(None) => debug!("Birthday {} was disabled or deleted meanwhile", birthday.id),
                Err(e) => {
                    warn!("Could not schedule reminder for {} ({}): {}", birthday.name, birthday.id, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Scheduled {} reminders ({} failed)",
            summary.scheduled, summary.failed
        );
        Ok(summary)
    }

    /// Reschedule enabled birthdays whose reminder time has already passed or
    /// whose registrations have gone missing
    pub async fn daily_consistency_check(&self) -> Result<ConsistencyReport> {
        let birthdays = self
            .storage
            .list_enabled()
            .await
            .context("Failed to load birthdays for the consistency check")?;

        let mut report = ConsistencyReport::default();
        for listed in &birthdays {
            report.checked += 1;

            let _guard = self.lock_id(listed.id).await;
            let birthday = match self.reload_locked(listed.id).await {
                Ok(Some(birthday)) if birthday.enabled => birthday,
                Ok(_) => {
                    debug!("Birthday {} was disabled or deleted meanwhile", listed.id);
                    self.cancel_locked(listed.id).await;
                    self.set_state(listed.id, ReminderState::Unscheduled);
                    continue;
                }
                Err(e) => {
                    warn!("Skipping consistency check for {}: {}", listed.id, e);
                    continue;
                }
            };

            let now = self.clock.now();
            let elapsed = match raw_fire_time(&birthday, now, self.settings.reminder_time, self.lunar.as_ref()) {
                Ok(fire_time) => fire_time < now,
                Err(e) => {
                    warn!("Skipping consistency check for {}: {}", birthday.id, e);
                    continue;
                }
            };

            let missing = !self.registrations_present(birthday.id);
            if !elapsed && !missing {
                continue;
            }

            debug!(
                "Repairing reminder for {} (elapsed: {}, missing: {})",
                birthday.id, elapsed, missing
            );
            match self.schedule_locked(&birthday, now).await {
                Ok(_) => report.repaired += 1,
                Err(e) => warn!("Could not repair reminder for {}: {}", birthday.id, e),
            }
        }

        info!(
            "Consistency check: {} checked, {} repaired",
            report.checked, report.repaired
        );
        Ok(report)
    }

    /// Apply `Scheduled -> Fired -> Scheduled(next)` for a delivered reminder
    pub async fn handle_fired(&self, fired: ReminderFired) -> Result<()> {
        let _guard = self.lock_id(fired.birthday_id).await;

        match self.reminder_state(fired.birthday_id) {
            ReminderState::Scheduled { fire_time } if fire_time == fired.fire_time => {}
            state => {
                debug!(
                    "Ignoring stale firing of {} at {} (state: {:?})",
                    fired.birthday_id, fired.fire_time, state
                );
                return Ok(());
            }
        }
        self.set_state(
            fired.birthday_id,
            ReminderState::Fired {
                fire_time: fired.fire_time,
            },
        );

        // A job can run slightly ahead of the wall clock; make sure the
        // renewal lands in the next cycle.
        let now = self
            .clock
            .now()
            .max(fired.fire_time + chrono::Duration::seconds(1));
        match self.sync_locked(fired.birthday_id, now).await? {
            Some(next) => info!("Renewed reminder for {} at {}", fired.birthday_id, next),
            None => debug!("Birthday {} is gone or disabled, not renewing", fired.birthday_id),
        }
        Ok(())
    }

    /// Consume firing events until every sender is dropped
    pub async fn run_event_loop(self, mut events: UnboundedReceiver<ReminderFired>) {
        info!("Reminder event loop started");
        while let Some(fired) = events.recv().await {
            if let Err(e) = self.handle_fired(fired).await {
                error!("Failed to renew reminder: {:#}", e);
            }
        }
        info!("Reminder event loop stopped");
    }

    pub fn reminder_state(&self, birthday_id: u64) -> ReminderState {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&birthday_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn job_pending(&self, birthday_id: u64) -> bool {
        self.job_queue.is_pending(&shared::Birthday::reminder_tag(birthday_id))
    }

    pub fn alarm_pending(&self, birthday_id: u64) -> bool {
        self.alarm_clock.is_pending(&shared::Birthday::reminder_tag(birthday_id))
    }

    fn registrations_present(&self, birthday_id: u64) -> bool {
        self.reminder_state(birthday_id).is_scheduled()
            && (self.job_pending(birthday_id) || self.alarm_pending(birthday_id))
    }

    async fn lock_id(&self, birthday_id: u64) -> IdGuard {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(birthday_id)
            .or_default()
            .clone();
        IdGuard {
            birthday_id,
            guard: Some(lock.lock_owned().await),
            locks: self.locks.clone(),
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn set_state(&self, birthday_id: u64, state: ReminderState) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        match state {
            ReminderState::Unscheduled => {
                states.remove(&birthday_id);
            }
            state => {
                states.insert(birthday_id, state);
            }
        }
    }

    /// Caller holds the id lock
    async fn reload_locked(&self, birthday_id: u64) -> Result<Option<Birthday>, SchedulingError> {
        self.storage
            .get_birthday(birthday_id)
            .await
            .map_err(|e| SchedulingError::Storage {
                id: birthday_id,
                source: e.into(),
            })
    }

    /// Caller holds the id lock. Registers the stored record, or clears the
    /// registrations when it is gone
    async fn sync_locked(
        &self,
        birthday_id: u64,
        now: NaiveDateTime,
    ) -> Result<Option<NaiveDateTime>, SchedulingError> {
        match self.reload_locked(birthday_id).await? {
            Some(birthday) => self.schedule_locked(&birthday, now).await,
            None => {
                self.cancel_locked(birthday_id).await;
                self.set_state(birthday_id, ReminderState::Unscheduled);
                Ok(None)
            }
        }
    }

    /// Caller holds the id lock
    async fn schedule_locked(
        &self,
        birthday: &Birthday,
        now: NaiveDateTime,
    ) -> Result<Option<NaiveDateTime>, SchedulingError> {
        self.cancel_locked(birthday.id).await;

        if !birthday.enabled {
            self.set_state(birthday.id, ReminderState::Unscheduled);
            return Ok(None);
        }

        let fire_time = match next_fire_time(birthday, now, self.settings.reminder_time, self.lunar.as_ref()) {
            Ok(fire_time) => fire_time,
            Err(e) => {
                self.set_state(birthday.id, ReminderState::Unscheduled);
                return Err(e.into());
            }
        };

        self.register_locked(birthday, fire_time, now).await?;
        Ok(Some(fire_time))
    }

    /// Caller holds the id lock
    async fn register_locked(
        &self,
        birthday: &Birthday,
        fire_time: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<(), SchedulingError> {
        let tag = birthday.reminder_tag();
        let payload = ReminderPayload::for_birthday(birthday, fire_time);
        let delay = (fire_time - now).to_std().unwrap_or(Duration::ZERO);

        let job = ReminderJob {
            tag: tag.clone(),
            delay,
            payload: payload.clone(),
            backoff: self.settings.backoff,
        };
        let job_registered = match self.job_queue.enqueue(job).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Job queue rejected {}: {}", tag, e);
                false
            }
        };

        let alarm_registered = match self.alarm_clock.set_exact_at(&tag, fire_time, payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Alarm clock rejected {}: {}", tag, e);
                false
            }
        };

        if !job_registered && !alarm_registered {
            self.set_state(birthday.id, ReminderState::Unscheduled);
            return Err(SchedulingError::RegistrationFailed { tag });
        }

        self.set_state(birthday.id, ReminderState::Scheduled { fire_time });
        info!(
            "Scheduled reminder for {} ({}) at {}, in {:?}",
            birthday.name, birthday.id, fire_time, delay
        );
        Ok(())
    }

    /// Caller holds the id lock
    async fn cancel_locked(&self, birthday_id: u64) {
        let tag = shared::Birthday::reminder_tag(birthday_id);
        if let Err(e) = self.job_queue.cancel_by_tag(&tag).await {
            warn!("Failed to cancel job {}: {}", tag, e);
        }
        if let Err(e) = self.alarm_clock.cancel(&tag).await {
            warn!("Failed to cancel alarm {}: {}", tag, e);
        }
    }
}
