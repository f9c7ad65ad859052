//! Outbound delivery gateways: SMS, voice, email, and device push.
//!
//! Each gateway is a trait (see [`gateway`]) with one production
//! implementation. Configuration is loaded from environment variables;
//! a missing required variable means that channel is not configured
//! and the corresponding `from_env` returns `None`.
//!
//! Every outbound call applies a bounded timeout and reports timeout
//! as failure. Callers must never mark a delivery guard on an error.

pub mod email;
pub mod error;
pub mod gateway;
pub mod push;
pub mod twilio;

pub use error::NotifyError;
pub use gateway::{DeviceNotifier, EmailGateway, ReminderTrigger, SmsGateway, VoiceGateway};
