//! Periodic escalation jobs.
//!
//! Each job owns a pool handle plus the delivery gateways it needs and
//! exposes two entrypoints: [`run`](RetryPoller::run), the cancellable
//! interval loop used by the worker binary, and `run_once`, a single
//! scan at a fixed instant that tests drive directly.
//!
//! A scan never aborts on a bad item. Store and delivery errors are
//! logged per dose and the loop moves on; because the sent guard is
//! only written after a successful hand-off, a failed item is picked
//! up again by the next scan.

mod caregiver;
mod confirmation;
mod retry_poller;

pub use caregiver::CaregiverEscalation;
pub use confirmation::ConfirmationDispatcher;
pub use retry_poller::RetryPoller;

/// Error handling a single scanned dose.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Reading or updating the dose store failed.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
    /// The delivery gateway rejected or never acknowledged the send.
    #[error("delivery error: {0}")]
    Delivery(#[from] careloop_notify::NotifyError),
}

/// What a single candidate needed at this instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// A notification was handed to a gateway.
    Sent,
    /// Nothing to do: not yet due, already recorded, or missing contact.
    Skipped,
}

/// Counters from one scan pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Notifications handed to a gateway.
    pub sent: usize,
    /// Candidates passed over.
    pub skipped: usize,
    /// Candidates whose delivery or recording failed.
    pub failed: usize,
}
