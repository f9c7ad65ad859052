//! Escalation tiers, timing windows, and job policy.
//!
//! All window arithmetic lives here as pure functions over an injected
//! reference time so jobs can be exercised in tests with a fixed `now`.
//! The tier layout for an unconfirmed dose scheduled at `T`:
//!
//! ```text
//! T+10 .. T+29   local retry 1 (gentle device push)
//! T+30 .. T+59   local retry 2 (stronger device push)
//! T+60 ..        caregiver escalation (server-side; threshold configurable)
//! ```
//!
//! The local windows are fixed; only the caregiver threshold is
//! configurable per deployment. The local and caregiver tracks are
//! intentionally unordered with respect to each other — each send is
//! authorized solely by its own guard column.

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Window constants (minutes after `scheduled_at`)
// ---------------------------------------------------------------------------

/// First local retry fires once elapsed time reaches this bound.
pub const RETRY_1_MINUTES: i64 = 10;

/// Second local retry fires once elapsed time reaches this bound.
pub const RETRY_2_MINUTES: i64 = 30;

/// No local retry fires at or past this bound; the caregiver tier owns it.
pub const LOCAL_CUTOFF_MINUTES: i64 = 60;

/// Default caregiver escalation threshold.
pub const DEFAULT_ESCALATION_MINUTES: i64 = 60;

/// Confirmation SMS window: how far behind `now` a due dose may be.
pub const CONFIRMATION_BEHIND_MINUTES: i64 = 5;

/// Confirmation SMS window: how far ahead of `now` a due dose may be.
pub const CONFIRMATION_AHEAD_MINUTES: i64 = 20;

/// How far back an inbound reply may match a confirmable pending dose.
pub const REPLY_LOOKBACK_MINUTES: i64 = 120;

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Local (device push) retry tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalRetry {
    /// T+10..T+29 — "please take your medication".
    First,
    /// T+30..T+59 — stronger wording.
    Second,
}

/// Minutes elapsed since `scheduled_at`, truncated toward zero.
///
/// Negative when the dose is not yet due.
pub fn elapsed_minutes(scheduled_at: Timestamp, now: Timestamp) -> i64 {
    (now - scheduled_at).num_minutes()
}

/// Which local retry tier, if any, is due for a dose scheduled at
/// `scheduled_at` when observed at `now`.
///
/// The local windows are fixed, unlike the caregiver threshold.
/// Returns `None` before T+10 and from T+60 onward. Whether the tier
/// has already been sent is the guard column's concern, not this
/// function's.
pub fn local_retry_due(scheduled_at: Timestamp, now: Timestamp) -> Option<LocalRetry> {
    let elapsed = elapsed_minutes(scheduled_at, now);
    if (RETRY_1_MINUTES..RETRY_2_MINUTES).contains(&elapsed) {
        Some(LocalRetry::First)
    } else if (RETRY_2_MINUTES..LOCAL_CUTOFF_MINUTES).contains(&elapsed) {
        Some(LocalRetry::Second)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// EscalationPolicy
// ---------------------------------------------------------------------------

/// Per-invocation escalation parameters.
///
/// Passed explicitly into each job run rather than read from ambient
/// global state, so jobs are independently testable with different
/// policies.
#[derive(Debug, Clone, Copy)]
pub struct EscalationPolicy {
    /// Minutes after `scheduled_at` at which caregiver escalation begins.
    pub escalation_minutes: i64,
    /// Whether the voice-call channel is enabled at all.
    pub voice_calls_enabled: bool,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            escalation_minutes: DEFAULT_ESCALATION_MINUTES,
            voice_calls_enabled: false,
        }
    }
}

impl EscalationPolicy {
    /// Whether a dose scheduled at `scheduled_at` has aged past the
    /// caregiver escalation threshold at `now`.
    pub fn caregiver_due(&self, scheduled_at: Timestamp, now: Timestamp) -> bool {
        elapsed_minutes(scheduled_at, now) >= self.escalation_minutes
    }

    /// Cutoff instant for caregiver candidate scans: doses scheduled at
    /// or before this instant are old enough to escalate.
    pub fn caregiver_cutoff(&self, now: Timestamp) -> Timestamp {
        now - chrono::Duration::minutes(self.escalation_minutes)
    }
}

// ---------------------------------------------------------------------------
// Scan windows
// ---------------------------------------------------------------------------

/// `[start, end]` of `scheduled_at` values eligible for a confirmation
/// SMS at `now`: slightly past-due through shortly upcoming.
pub fn confirmation_window(now: Timestamp) -> (Timestamp, Timestamp) {
    (
        now - chrono::Duration::minutes(CONFIRMATION_BEHIND_MINUTES),
        now + chrono::Duration::minutes(CONFIRMATION_AHEAD_MINUTES),
    )
}

/// `[start, end]` of `scheduled_at` values the local retry poller scans
/// at `now`: old enough for retry 1, not yet past the local cutoff.
pub fn local_retry_window(now: Timestamp) -> (Timestamp, Timestamp) {
    (
        now - chrono::Duration::minutes(LOCAL_CUTOFF_MINUTES),
        now - chrono::Duration::minutes(RETRY_1_MINUTES),
    )
}

/// Earliest `scheduled_at` an inbound reply may resolve at `now`.
pub fn reply_lookback_start(now: Timestamp) -> Timestamp {
    now - chrono::Duration::minutes(REPLY_LOOKBACK_MINUTES)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
