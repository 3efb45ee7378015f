//! Webhook delivery.
//!
//! Alerts and status updates go out as JSON POSTs, fire-and-forget: a
//! failed delivery is logged and dropped, never retried, and never
//! fails the check cycle that produced it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::types::{AlertEvent, TrackerError, TrackerStatus};

/// Outbound notification sink.
///
/// The production implementation posts to a webhook; tests substitute a
/// recording sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alert(&self, alert: &AlertEvent) -> Result<()>;
    async fn send_status(&self, status: &TrackerStatus) -> Result<()>;
}

/// Posts JSON payloads to the configured webhook URL.
pub struct WebhookNotifier {
    http: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("farewatch/0.1.0 (airfare-monitor)")
            .build()
            .context("Failed to build HTTP client for webhook delivery")?;

        Ok(Self { http, url })
    }

    async fn post_json(&self, payload: &serde_json::Value) -> Result<()> {
        let resp = self
            .http
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .context("Webhook request failed")?;

        if !resp.status().is_success() {
            return Err(TrackerError::Delivery(format!("webhook returned {}", resp.status())).into());
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_alert(&self, alert: &AlertEvent) -> Result<()> {
        let payload = serde_json::to_value(alert).context("Failed to serialize alert")?;
        self.post_json(&payload).await?;
        info!(alert = %alert, "Deal alert delivered");
        Ok(())
    }

    async fn send_status(&self, status: &TrackerStatus) -> Result<()> {
        let payload = serde_json::to_value(status).context("Failed to serialize status")?;
        self.post_json(&payload).await?;
        debug!(kind = %status.kind, "Status update delivered");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
