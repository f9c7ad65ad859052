//! Gateway traits: the seams between the escalation jobs and the
//! outside world.
//!
//! Jobs hold `Arc<dyn ...>` handles so tests can substitute recording
//! doubles and assert exactly what would have been sent.

use async_trait::async_trait;
use careloop_core::messages::ReminderKind;
use careloop_core::types::{DbId, Timestamp};

use crate::error::NotifyError;

/// A device reminder trigger.
///
/// `id` is the dose id; scheduling again with the same id replaces the
/// existing trigger rather than duplicating it. `device_token`
/// addresses the recipient device; the trigger payload itself carries
/// no addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderTrigger {
    pub id: DbId,
    pub device_token: String,
    pub title: String,
    pub body: String,
    pub fire_at: Timestamp,
    pub kind: ReminderKind,
}

/// Outbound SMS delivery.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Send `body` to an E.164 destination number.
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotifyError>;
}

/// Outbound voice call delivery.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Place a call to an E.164 number that reads `script` aloud.
    async fn place_call(&self, to: &str, script: &str) -> Result<(), NotifyError>;
}

/// Outbound email delivery.
#[async_trait]
pub trait EmailGateway: Send + Sync {
    /// Send a plain-text email.
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Device push scheduling.
#[async_trait]
pub trait DeviceNotifier: Send + Sync {
    /// Schedule (or replace) the trigger identified by `trigger.id`.
    async fn schedule(&self, trigger: &ReminderTrigger) -> Result<(), NotifyError>;

    /// Remove any pending trigger for `dose_id`. Removing a trigger
    /// that does not exist is a success.
    async fn cancel(&self, dose_id: DbId) -> Result<(), NotifyError>;
}
