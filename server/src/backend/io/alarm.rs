//! # Wall-Clock Alarm
//!
//! Redundant reminder delivery path. Unlike the job queue, an alarm targets a
//! wall-clock timestamp: it re-reads the [`Clock`] in bounded slices, so moving
//! the system clock forward or back moves the trigger with it. Alarms fire
//! once and are not retried; a failed delivery is left to the job queue path.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::job_queue::JobHandler;
use super::task_registry::TaskRegistry;
use crate::backend::domain::clock::Clock;
use crate::backend::domain::models::reminder::ReminderPayload;

/// Exact wall-clock triggers addressed by tag
#[async_trait]
pub trait AlarmClock: Send + Sync {
    /// Register an alarm at `at`; an existing alarm under the same tag is replaced
    async fn set_exact_at(&self, tag: &str, at: NaiveDateTime, payload: ReminderPayload) -> Result<()>;

    /// Remove the alarm under `tag`; no-op when nothing is registered
    async fn cancel(&self, tag: &str) -> Result<()>;

    fn is_pending(&self, tag: &str) -> bool;
}

/// Alarm clock backed by one Tokio task per alarm
#[derive(Clone)]
pub struct TokioAlarmClock {
    clock: Arc<dyn Clock>,
    handler: Arc<dyn JobHandler>,
    poll_interval: Duration,
    registry: TaskRegistry,
}

impl TokioAlarmClock {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

    pub fn new(clock: Arc<dyn Clock>, handler: Arc<dyn JobHandler>, poll_interval: Duration) -> Self {
        Self {
            clock,
            handler,
            poll_interval,
            registry: TaskRegistry::new(),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.registry.pending_count()
    }
}

#[async_trait]
impl AlarmClock for TokioAlarmClock {
    async fn set_exact_at(&self, tag: &str, at: NaiveDateTime, payload: ReminderPayload) -> Result<()> {
        let clock = self.clock.clone();
        let handler = self.handler.clone();
        let poll_interval = self.poll_interval;
        let owned_tag = tag.to_string();

        self.registry.spawn(tag, async move {
            wait_until(clock.as_ref(), at, poll_interval).await;
            info!("⏰ Alarm {} went off (set for {})", owned_tag, at);
            if let Err(e) = handler.run(&payload).await {
                warn!("Alarm {} could not deliver its reminder: {}", owned_tag, e);
            }
        });

        debug!("Alarm set for {} at {}", tag, at);
        Ok(())
    }

    async fn cancel(&self, tag: &str) -> Result<()> {
        if self.registry.cancel(tag) {
            debug!("Cancelled alarm for {}", tag);
        }
        Ok(())
    }

    fn is_pending(&self, tag: &str) -> bool {
        self.registry.is_pending(tag)
    }
}

/// Sleep until the wall clock reaches `at`, never longer than `poll_interval` at a time
async fn wait_until(clock: &dyn Clock, at: NaiveDateTime, poll_interval: Duration) {
    loop {
        let now = clock.now();
        if now >= at {
            return;
        }
        let remaining = (at - now).to_std().unwrap_or(Duration::ZERO);
        tokio::time::sleep(remaining.min(poll_interval)).await;
    }
}
