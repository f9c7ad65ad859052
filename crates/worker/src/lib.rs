//! Careloop escalation worker.
//!
//! This crate hosts the server-side background jobs that keep a missed
//! dose moving through the escalation ladder:
//!
//! - [`jobs::RetryPoller`] — schedules the 10- and 30-minute device
//!   retry reminders for users whose device missed them.
//! - [`jobs::ConfirmationDispatcher`] — sends the reply-to-confirm SMS
//!   for critical doses shortly after their scheduled time.
//! - [`jobs::CaregiverEscalation`] — notifies the caregiver over SMS,
//!   email, and optionally voice once a critical dose has gone
//!   unconfirmed past the escalation cutoff.
//!
//! Each job scans the dose table on an interval and records every send
//! with a compare-and-set guard column, so concurrent workers and
//! repeated scans stay single-shot per dose and channel.

pub mod config;
pub mod jobs;

pub use config::WorkerConfig;
