//! # Notification Sink
//!
//! Where delivered reminders end up. A notification carries a dedupe key; a
//! later delivery with the same key replaces the earlier one instead of
//! stacking, which keeps the two delivery paths from showing doubles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A rendered notification ready to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
    pub dedupe_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The user has not allowed notifications; deliveries are dropped
    #[error("Notification permission denied")]
    PermissionDenied,
    /// The notification service could not take the message right now
    #[error("Notification service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredNotification {
    pub message: NotificationMessage,
    pub delivered_at: DateTime<Utc>,
}

/// Writes notifications to the log and keeps the ones currently shown
#[derive(Clone)]
pub struct LogNotificationSink {
    permission_granted: Arc<AtomicBool>,
    active: Arc<Mutex<HashMap<String, DeliveredNotification>>>,
}

impl LogNotificationSink {
    pub fn new(permission_granted: bool) -> Self {
        Self {
            permission_granted: Arc::new(AtomicBool::new(permission_granted)),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn set_permission_granted(&self, granted: bool) {
        self.permission_granted.store(granted, Ordering::SeqCst);
    }

    pub fn has_permission(&self) -> bool {
        self.permission_granted.load(Ordering::SeqCst)
    }

    /// Notifications currently shown, oldest first
    pub fn active_notifications(&self) -> Vec<DeliveredNotification> {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let mut notifications: Vec<DeliveredNotification> = active.values().cloned().collect();
        notifications.sort_by_key(|notification| notification.delivered_at);
        notifications
    }

    /// Dismiss a notification; returns whether it was shown
    pub fn dismiss(&self, dedupe_key: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(dedupe_key)
            .is_some()
    }
}

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), DeliveryError> {
        if !self.has_permission() {
            return Err(DeliveryError::PermissionDenied);
        }

        info!("🔔 {} | {}", message.title, message.body);

        let delivered = DeliveredNotification {
            message: message.clone(),
            delivered_at: Utc::now(),
        };
        let replaced = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(message.dedupe_key.clone(), delivered);

        if replaced.is_some() {
            warn!("Replaced an earlier notification with key {}", message.dedupe_key);
        }
        Ok(())
    }
}
