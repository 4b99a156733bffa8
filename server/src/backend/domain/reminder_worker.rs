//! # Reminder Worker
//!
//! The unit of work both delivery paths run when a reminder comes due. It
//! renders the notification, hands it to the [`NotificationSink`] and reports
//! the firing back to the scheduler so the reminder renews for next year.

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::backend::domain::models::reminder::{ReminderFired, ReminderPayload};
use crate::backend::io::job_queue::JobHandler;
use crate::backend::io::notification::{DeliveryError, NotificationMessage, NotificationSink};

#[derive(Clone)]
pub struct ReminderWorker {
    sink: Arc<dyn NotificationSink>,
    fired: UnboundedSender<ReminderFired>,
}

impl ReminderWorker {
    pub fn new(sink: Arc<dyn NotificationSink>, fired: UnboundedSender<ReminderFired>) -> Self {
        Self { sink, fired }
    }
}

#[async_trait]
impl JobHandler for ReminderWorker {
    async fn run(&self, payload: &ReminderPayload) -> Result<()> {
        let message = reminder_message(
            payload.birthday_id,
            &payload.name,
            &payload.relationship,
            payload.reminder_days_before,
        );

        match self.sink.deliver(&message).await {
            Ok(()) => info!("Delivered birthday reminder for {} ({})", payload.name, payload.birthday_id),
            Err(DeliveryError::PermissionDenied) => {
                warn!(
                    "Notification permission denied, dropping reminder for {} ({})",
                    payload.name, payload.birthday_id
                );
            }
            // Transient: let the job queue retry
            Err(e) => return Err(e.into()),
        }

        let fired = ReminderFired {
            birthday_id: payload.birthday_id,
            fire_time: payload.fire_time,
        };
        if self.fired.send(fired).is_err() {
            warn!("Reminder event loop is gone; {} will not renew until the next check", payload.tag());
        }
        Ok(())
    }
}

pub fn reminder_title(name: &str, reminder_days_before: u32) -> String {
    match reminder_days_before {
        0 => format!("🎂 Today is {}'s birthday!", name),
        1 => format!("🎉 {}'s birthday is tomorrow", name),
        days => format!("📅 {}'s birthday is in {} days", name, days),
    }
}

pub fn reminder_body(name: &str, relationship: &str) -> String {
    let recipient = relationship.trim();
    if recipient.is_empty() {
        format!("Don't forget to prepare a birthday surprise for {}!", name)
    } else {
        format!("Don't forget to prepare a birthday surprise for your {}!", recipient)
    }
}

/// Notification for a birthday, keyed so a repeat delivery replaces it
pub fn reminder_message(
    birthday_id: u64,
    name: &str,
    relationship: &str,
    reminder_days_before: u32,
) -> NotificationMessage {
    NotificationMessage {
        title: reminder_title(name, reminder_days_before),
        body: reminder_body(name, relationship),
        dedupe_key: shared::Birthday::reminder_tag(birthday_id),
    }
}
