//! Webhook notifier.
//!
//! POSTs a JSON document to a configured URL for every origin change:
//!
//! ```json
//! {
//!   "user_id": "0b6c2a54-5d7e-4a53-9a53-2f1f5e0c8d11",
//!   "old_ip": "1.2.3.4",
//!   "new_ip": "5.6.7.8",
//!   "time": "2026-01-01T12:00:00+00:00",
//!   "message": "Token refresh attempted from a new IP address"
//! }
//! ```

use super::{Notifier, NotifyError, OriginChange};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const ORIGIN_CHANGE_MESSAGE: &str = "Token refresh attempted from a new IP address";

/// Configuration for the webhook notifier.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Endpoint receiving the alerts.
    pub url: String,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
}

impl WebhookConfig {
    /// Create a new webhook configuration.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            timeout_seconds: 10,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    user_id: String,
    old_ip: &'a str,
    new_ip: &'a str,
    time: String,
    message: &'a str,
}

impl<'a> From<&'a OriginChange> for WebhookPayload<'a> {
    fn from(alert: &'a OriginChange) -> Self {
        Self {
            user_id: alert.owner_id.to_string(),
            old_ip: &alert.old_origin,
            new_ip: &alert.new_origin,
            time: alert.detected_at.to_rfc3339(),
            message: ORIGIN_CHANGE_MESSAGE,
        }
    }
}

/// Delivers origin-change alerts over HTTP.
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: Client,
}

impl WebhookNotifier {
    /// Create a new webhook notifier.
    pub fn new(config: WebhookConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| NotifyError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, alert: &OriginChange) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.config.url)
            .json(&WebhookPayload::from(alert))
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }

        Ok(())
    }
}
