//! # Deferred Job Queue
//!
//! The primary reminder delivery path: a one-shot job that waits out a delay,
//! then runs a [`JobHandler`], retrying failed runs with a linear backoff.
//! Jobs are addressed by tag so the scheduler can cancel them.
//!
//! The delay is measured on the monotonic clock. A wall-clock change while a
//! job is waiting does not move it; the alarm path and the clock watcher cover
//! that case.

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::task_registry::TaskRegistry;
use crate::backend::domain::models::reminder::ReminderPayload;

/// Linear retry policy: attempt `n` waits `n * min_backoff` before the next try
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub min_backoff: Duration,
    pub max_attempts: u32,
}

impl BackoffPolicy {
    pub const DEFAULT_MIN_BACKOFF: Duration = Duration::from_secs(15);
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    pub fn linear(min_backoff: Duration, max_attempts: u32) -> Self {
        Self {
            min_backoff,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Wait after the given failed attempt (1-based)
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        self.min_backoff.saturating_mul(attempt.max(1))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::linear(Self::DEFAULT_MIN_BACKOFF, Self::DEFAULT_MAX_ATTEMPTS)
    }
}

/// A reminder job waiting to run
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderJob {
    pub tag: String,
    pub delay: Duration,
    pub payload: ReminderPayload,
    pub backoff: BackoffPolicy,
}

/// The work a job or alarm performs when it comes due
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, payload: &ReminderPayload) -> Result<()>;
}

/// Deferred, retried, tag-cancellable work
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Register a job; an existing job under the same tag is replaced
    async fn enqueue(&self, job: ReminderJob) -> Result<()>;

    /// Drop the job under `tag`; no-op when nothing is queued
    async fn cancel_by_tag(&self, tag: &str) -> Result<()>;

    fn is_pending(&self, tag: &str) -> bool;
}

/// Job queue backed by one Tokio task per job
#[derive(Clone)]
pub struct TokioJobQueue {
    handler: Arc<dyn JobHandler>,
    registry: TaskRegistry,
}

impl TokioJobQueue {
    pub fn new(handler: Arc<dyn JobHandler>) -> Self {
        Self {
            handler,
            registry: TaskRegistry::new(),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.registry.pending_count()
    }
}

#[async_trait]
impl JobQueue for TokioJobQueue {
    async fn enqueue(&self, job: ReminderJob) -> Result<()> {
        let handler = self.handler.clone();
        let tag = job.tag.clone();
        let delay = job.delay;

        let job_id = self.registry.spawn(&tag, async move {
            tokio::time::sleep(job.delay).await;
            run_with_backoff(handler.as_ref(), &job).await;
        });

        debug!("Queued job {} for {} to run in {:?}", job_id, tag, delay);
        Ok(())
    }

    async fn cancel_by_tag(&self, tag: &str) -> Result<()> {
        if self.registry.cancel(tag) {
            debug!("Cancelled queued job for {}", tag);
        }
        Ok(())
    }

    fn is_pending(&self, tag: &str) -> bool {
        self.registry.is_pending(tag)
    }
}

/// Run the job until it succeeds or its attempts are used up
async fn run_with_backoff(handler: &dyn JobHandler, job: &ReminderJob) {
    let mut attempt = 1;
    loop {
        match handler.run(&job.payload).await {
            Ok(()) => {
                info!("Job {} completed on attempt {}", job.tag, attempt);
                return;
            }
            Err(e) if attempt < job.backoff.max_attempts => {
                let wait = job.backoff.delay_after_attempt(attempt);
                warn!(
                    "Job {} failed on attempt {}: {}. Retrying in {:?}",
                    job.tag, attempt, e, wait
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => {
                error!(
                    "Job {} failed after {} attempts, giving up: {}",
                    job.tag, attempt, e
                );
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Fails a configured number of times before succeeding
    struct FlakyHandler {
        failures_left: AtomicU32,
        runs: Mutex<Vec<u64>>,
    }

    impl FlakyHandler {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                runs: Mutex::new(Vec::new()),
            }
        }

        fn run_count(&self) -> usize {
            self.runs.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl JobHandler for FlakyHandler {
        async fn run(&self, payload: &ReminderPayload) -> Result<()> {
            self.runs.lock().unwrap().push(payload.birthday_id);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(anyhow::anyhow!("transient failure"));
            }
            Ok(())
        }
    }

    fn job(delay_ms: u64, backoff: BackoffPolicy) -> ReminderJob {
        let fire_time = NaiveDate::from_ymd_opt(2024, 12, 24)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        ReminderJob {
            tag: "birthday_reminder_7".to_string(),
            delay: Duration::from_millis(delay_ms),
            payload: ReminderPayload {
                birthday_id: 7,
                name: "Alice".to_string(),
                relationship: String::new(),
                reminder_days_before: 1,
                fire_time,
            },
            backoff,
        }
    }

    #[test]
    fn test_linear_backoff() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.min_backoff, Duration::from_secs(15));
        assert_eq!(policy.delay_after_attempt(1), Duration::from_secs(15));
        assert_eq!(policy.delay_after_attempt(2), Duration::from_secs(30));
        assert_eq!(policy.delay_after_attempt(3), Duration::from_secs(45));
        assert_eq!(BackoffPolicy::linear(Duration::from_secs(1), 0).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_job_runs_after_delay() {
        let handler = Arc::new(FlakyHandler::new(0));
        let queue = TokioJobQueue::new(handler.clone());

        queue.enqueue(job(30, BackoffPolicy::default())).await.unwrap();
        assert!(queue.is_pending("birthday_reminder_7"));
        assert_eq!(handler.run_count(), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(handler.run_count(), 1);
        assert!(!queue.is_pending("birthday_reminder_7"));
    }

    #[tokio::test]
    async fn test_job_retries_with_backoff() {
        let handler = Arc::new(FlakyHandler::new(2));
        let queue = TokioJobQueue::new(handler.clone());

        let backoff = BackoffPolicy::linear(Duration::from_millis(10), 5);
        queue.enqueue(job(0, backoff)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(handler.run_count(), 3);
        assert!(!queue.is_pending("birthday_reminder_7"));
    }

    #[tokio::test]
    async fn test_job_gives_up_after_max_attempts() {
        let handler = Arc::new(FlakyHandler::new(10));
        let queue = TokioJobQueue::new(handler.clone());

        let backoff = BackoffPolicy::linear(Duration::from_millis(5), 3);
        queue.enqueue(job(0, backoff)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(handler.run_count(), 3);
    }

    #[tokio::test]
    async fn test_cancel_by_tag() {
        let handler = Arc::new(FlakyHandler::new(0));
        let queue = TokioJobQueue::new(handler.clone());

        queue.enqueue(job(50, BackoffPolicy::default())).await.unwrap();
        queue.cancel_by_tag("birthday_reminder_7").await.unwrap();
        // Nothing left to cancel
        queue.cancel_by_tag("birthday_reminder_7").await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(handler.run_count(), 0);
        assert_eq!(queue.pending_count(), 0);
    }
}
