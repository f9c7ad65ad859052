//! Device push scheduling through an HTTP relay.
//!
//! The relay owns the device-facing side (APNs/FCM and local trigger
//! queues); this gateway only tells it which trigger to schedule or
//! cancel. Trigger ids are dose ids, and the relay replaces on
//! duplicate id, which is what makes `schedule` idempotent.

use std::time::Duration;

use async_trait::async_trait;
use careloop_core::types::DbId;

use crate::error::NotifyError;
use crate::gateway::{DeviceNotifier, ReminderTrigger};

/// HTTP request timeout for a single relay call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// PushConfig
// ---------------------------------------------------------------------------

/// Configuration for the push relay gateway.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Base URL of the relay service.
    pub gateway_url: String,
    /// Optional bearer token the relay requires.
    pub gateway_token: Option<String>,
}

impl PushConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `PUSH_GATEWAY_URL` is not set, signalling
    /// that device push is not configured.
    ///
    /// | Variable             | Required | Default |
    /// |----------------------|----------|---------|
    /// | `PUSH_GATEWAY_URL`   | yes      | —       |
    /// | `PUSH_GATEWAY_TOKEN` | no       | —       |
    pub fn from_env() -> Option<Self> {
        let gateway_url = std::env::var("PUSH_GATEWAY_URL").ok()?;
        Some(Self {
            gateway_url,
            gateway_token: std::env::var("PUSH_GATEWAY_TOKEN").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// HttpPush
// ---------------------------------------------------------------------------

/// Schedules and cancels device triggers via the push relay.
pub struct HttpPush {
    config: PushConfig,
    client: reqwest::Client,
}

impl HttpPush {
    pub fn new(config: PushConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { config, client }
    }

    async fn post(&self, path: &str, payload: &serde_json::Value) -> Result<(), NotifyError> {
        let url = format!("{}{path}", self.config.gateway_url);
        let mut request = self.client.post(&url).json(payload);
        if let Some(token) = &self.config.gateway_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifyError::Gateway {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceNotifier for HttpPush {
    async fn schedule(&self, trigger: &ReminderTrigger) -> Result<(), NotifyError> {
        let payload = serde_json::json!({
            "id": trigger.id,
            "deviceToken": trigger.device_token,
            "title": trigger.title,
            "body": trigger.body,
            "fireAt": trigger.fire_at,
            "data": {
                "doseId": trigger.id,
                "kind": trigger.kind.as_str(),
            },
        });
        self.post("/triggers", &payload).await?;
        tracing::info!(dose_id = trigger.id, kind = trigger.kind.as_str(), "Device trigger scheduled");
        Ok(())
    }

    async fn cancel(&self, dose_id: DbId) -> Result<(), NotifyError> {
        let payload = serde_json::json!({ "id": dose_id });
        self.post("/triggers/cancel", &payload).await?;
        tracing::info!(dose_id, "Device trigger cancelled");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
