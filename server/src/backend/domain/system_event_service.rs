//! Reacts to system events that can invalidate registered reminders.
//!
//! A reboot drops every pending registration, and a clock or timezone change
//! moves the instant each reminder is due. Any such event re-registers all
//! enabled reminders from the data store.

use anyhow::Result;
use log::{error, info};
use shared::SystemEventKind;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::backend::domain::reminder_scheduler::{ReminderScheduler, ScheduleSummary};

#[derive(Clone)]
pub struct SystemEventService {
    scheduler: ReminderScheduler,
}

impl SystemEventService {
    pub fn new(scheduler: ReminderScheduler) -> Self {
        Self { scheduler }
    }

    pub async fn handle_event(&self, event: SystemEventKind) -> Result<ScheduleSummary> {
        info!("System event received: {}", event);
        self.scheduler.schedule_all_reminders().await
    }

    /// Handle events until every sender is dropped
    pub async fn run(self, mut events: UnboundedReceiver<SystemEventKind>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle_event(event).await {
                error!("Failed to reschedule reminders after {}: {:#}", event, e);
            }
        }
    }
}
