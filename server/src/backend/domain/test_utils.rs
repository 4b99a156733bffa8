//! Fakes shared by the domain and io tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::backend::domain::clock::Clock;
use crate::backend::domain::models::reminder::ReminderPayload;
use crate::backend::io::alarm::AlarmClock;
use crate::backend::io::job_queue::{JobHandler, JobQueue, ReminderJob};
use crate::backend::io::notification::{DeliveryError, NotificationMessage, NotificationSink};

/// Wall clock that only moves when told to
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        let now = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid test timestamp");
        Self::new(now)
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}

/// Job handler that records every payload it runs
#[derive(Default)]
pub struct RecordingHandler {
    runs: Mutex<Vec<ReminderPayload>>,
}

impl RecordingHandler {
    pub fn runs(&self) -> Vec<ReminderPayload> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobHandler for RecordingHandler {
    async fn run(&self, payload: &ReminderPayload) -> Result<()> {
        self.runs.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// Job queue that keeps jobs in a map instead of running them
#[derive(Default)]
pub struct RecordingJobQueue {
    jobs: Mutex<HashMap<String, ReminderJob>>,
    enqueued: Mutex<usize>,
    failing: AtomicBool,
}

impl RecordingJobQueue {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn job(&self, tag: &str) -> Option<ReminderJob> {
        self.jobs.lock().unwrap().get(tag).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Total number of accepted enqueue calls
    pub fn enqueue_count(&self) -> usize {
        *self.enqueued.lock().unwrap()
    }

    /// Forget a job as if it had completed
    pub fn complete(&self, tag: &str) {
        self.jobs.lock().unwrap().remove(tag);
    }
}

#[async_trait]
impl JobQueue for RecordingJobQueue {
    async fn enqueue(&self, job: ReminderJob) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("job queue rejected {}", job.tag));
        }
        *self.enqueued.lock().unwrap() += 1;
        self.jobs.lock().unwrap().insert(job.tag.clone(), job);
        Ok(())
    }

    async fn cancel_by_tag(&self, tag: &str) -> Result<()> {
        self.jobs.lock().unwrap().remove(tag);
        Ok(())
    }

    fn is_pending(&self, tag: &str) -> bool {
        self.jobs.lock().unwrap().contains_key(tag)
    }
}

/// Alarm clock that keeps alarms in a map instead of waiting on them
#[derive(Default)]
pub struct RecordingAlarmClock {
    alarms: Mutex<HashMap<String, (NaiveDateTime, ReminderPayload)>>,
    failing: AtomicBool,
}

impl RecordingAlarmClock {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn alarm_time(&self, tag: &str) -> Option<NaiveDateTime> {
        self.alarms.lock().unwrap().get(tag).map(|(at, _)| *at)
    }

    pub fn pending_count(&self) -> usize {
        self.alarms.lock().unwrap().len()
    }

    pub fn complete(&self, tag: &str) {
        self.alarms.lock().unwrap().remove(tag);
    }
}

#[async_trait]
impl AlarmClock for RecordingAlarmClock {
    async fn set_exact_at(&self, tag: &str, at: NaiveDateTime, payload: ReminderPayload) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("alarm clock rejected {}", tag));
        }
        self.alarms.lock().unwrap().insert(tag.to_string(), (at, payload));
        Ok(())
    }

    async fn cancel(&self, tag: &str) -> Result<()> {
        self.alarms.lock().unwrap().remove(tag);
        Ok(())
    }

    fn is_pending(&self, tag: &str) -> bool {
        self.alarms.lock().unwrap().contains_key(tag)
    }
}

/// Sink that records deliveries, optionally failing them
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<NotificationMessage>>,
    failure: Mutex<Option<DeliveryError>>,
}

impl RecordingSink {
    pub fn failing_with(error: DeliveryError) -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            failure: Mutex::new(Some(error)),
        }
    }

    pub fn delivered(&self) -> Vec<NotificationMessage> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), DeliveryError> {
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        self.delivered.lock().unwrap().push(message.clone());
        Ok(())
    }
}
