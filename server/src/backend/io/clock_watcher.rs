//! Detects wall-clock jumps.
//!
//! The job queue measures delays on the monotonic clock, so a user or NTP
//! moving the wall clock leaves queued reminders at the wrong instant. The
//! watcher compares wall-clock progress with monotonic progress each interval
//! and reports a [`SystemEventKind::ClockChanged`] when they disagree.

use chrono::NaiveDateTime;
use log::{debug, info};
use shared::SystemEventKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

use crate::backend::domain::clock::Clock;

pub struct ClockWatcher {
    clock: Arc<dyn Clock>,
    interval: Duration,
    tolerance: Duration,
}

impl ClockWatcher {
    pub fn new(clock: Arc<dyn Clock>, interval: Duration, tolerance: Duration) -> Self {
        Self {
            clock,
            interval,
            tolerance,
        }
    }

    /// Watch until the receiving side goes away
    pub async fn run(self, events: UnboundedSender<SystemEventKind>) {
        let mut wall_before = self.clock.now();
        let mut mono_before = Instant::now();

        loop {
            tokio::time::sleep(self.interval).await;

            let wall_now = self.clock.now();
            let mono_now = Instant::now();
            let elapsed = mono_now.duration_since(mono_before);

            if let Some(drift) = detect_drift(wall_before, wall_now, elapsed, self.tolerance) {
                info!("Wall clock moved by {}s relative to elapsed time", drift.num_seconds());
                if events.send(SystemEventKind::ClockChanged).is_err() {
                    debug!("Clock watcher stopping, nobody is listening");
                    return;
                }
            }

            wall_before = wall_now;
            mono_before = mono_now;
        }
    }
}

/// Difference between wall-clock and monotonic progress, if beyond `tolerance`
pub fn detect_drift(
    wall_before: NaiveDateTime,
    wall_now: NaiveDateTime,
    elapsed: Duration,
    tolerance: Duration,
) -> Option<chrono::Duration> {
    let elapsed = chrono::Duration::from_std(elapsed).ok()?;
    let tolerance = chrono::Duration::from_std(tolerance).ok()?;
    let drift = (wall_now - wall_before) - elapsed;
    (drift.abs() > tolerance).then_some(drift)
}
