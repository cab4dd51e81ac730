//! Out-of-band alerts when a refresh arrives from a new network origin.
//!
//! Alerts are informational. The session manager hands them to a
//! [`NotificationHandle`], which queues them for a background worker and returns
//! immediately; the refresh outcome never depends on delivery.

pub mod webhook;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::auth::OwnerId;

pub use webhook::{WebhookConfig, WebhookNotifier};

/// Default queue capacity for pending alerts
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// A refresh from an address other than the one recorded on the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OriginChange {
    pub owner_id: OwnerId,
    pub old_origin: String,
    pub new_origin: String,
    pub detected_at: DateTime<Utc>,
}

impl OriginChange {
    pub fn new(owner_id: OwnerId, old_origin: &str, new_origin: &str) -> Self {
        Self {
            owner_id,
            old_origin: old_origin.to_string(),
            new_origin: new_origin.to_string(),
            detected_at: Utc::now(),
        }
    }
}

/// Notification delivery errors
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Transport failure
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    /// Receiver answered with an error status
    #[error("Notification rejected with HTTP {0}")]
    Rejected(u16),

    /// Notifier could not be constructed
    #[error("Notifier configuration error: {0}")]
    Config(String),
}

/// Receives origin-change alerts
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &OriginChange) -> Result<(), NotifyError>;
}

/// Notifier that only writes the alert to the log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, alert: &OriginChange) -> Result<(), NotifyError> {
        log::warn!(
            "Refresh for owner {} from new origin {} (previously {})",
            alert.owner_id,
            alert.new_origin,
            alert.old_origin
        );
        Ok(())
    }
}

/// Sending side of the alert queue
///
/// Cheap to clone. `dispatch` never waits: a full or closed queue drops the
/// alert with a warning.
#[derive(Clone)]
pub struct NotificationHandle {
    sender: Option<mpsc::Sender<OriginChange>>,
}

impl NotificationHandle {
    /// Handle that silently discards every alert
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Queue an alert for background delivery
    pub fn dispatch(&self, alert: OriginChange) {
        let Some(sender) = &self.sender else {
            return;
        };

        match sender.try_send(alert) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(alert)) => {
                log::warn!(
                    "Notification queue full, dropping origin alert for owner {}",
                    alert.owner_id
                );
            }
            Err(mpsc::error::TrySendError::Closed(alert)) => {
                log::warn!(
                    "Notification worker stopped, dropping origin alert for owner {}",
                    alert.owner_id
                );
            }
        }
    }

    /// Whether alerts go anywhere
    pub fn is_enabled(&self) -> bool {
        self.sender.as_ref().is_some_and(|s| !s.is_closed())
    }
}

/// Background worker delivering queued alerts
pub struct NotificationDispatcher {
    inbox: mpsc::Receiver<OriginChange>,
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    /// Spawn the worker on the current tokio runtime
    ///
    /// # Returns
    ///
    /// * `(NotificationHandle, JoinHandle<()>)` - Handle for queueing alerts and
    ///   the worker task. The worker exits once every handle is dropped.
    pub fn spawn(notifier: Arc<dyn Notifier>, capacity: usize) -> (NotificationHandle, JoinHandle<()>) {
        let (sender, inbox) = mpsc::channel(capacity.max(1));
        let dispatcher = Self { inbox, notifier };
        let task = tokio::spawn(dispatcher.run());

        (
            NotificationHandle {
                sender: Some(sender),
            },
            task,
        )
    }

    async fn run(mut self) {
        log::debug!("Notification dispatcher started");

        while let Some(alert) = self.inbox.recv().await {
            if let Err(e) = self.notifier.notify(&alert).await {
                log::warn!(
                    "Failed to deliver origin alert for owner {}: {}",
                    alert.owner_id,
                    e
                );
            }
        }

        log::debug!("Notification dispatcher stopped");
    }
}
