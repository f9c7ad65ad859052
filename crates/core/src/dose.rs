//! Dose event status constants and the resolution state machine.
//!
//! A dose event starts `pending` and is resolved exactly once, by the user
//! or on the user's behalf. Every resolved status is terminal for
//! escalation purposes: no delivery job may set a guard column on a dose
//! that has left `pending`, and a resolved dose never changes status again.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

/// Awaiting user confirmation; the only status escalation acts on.
pub const STATUS_PENDING: &str = "pending";
/// User confirmed the dose was taken.
pub const STATUS_TAKEN: &str = "taken";
/// User declined the dose.
pub const STATUS_SKIPPED: &str = "skipped";
/// User deferred the dose; a new pending event carries the new due time.
pub const STATUS_SNOOZED: &str = "snoozed";

/// All valid dose event statuses.
pub const VALID_STATUSES: &[&str] =
    &[STATUS_PENDING, STATUS_TAKEN, STATUS_SKIPPED, STATUS_SNOOZED];

// ---------------------------------------------------------------------------
// DoseStatus
// ---------------------------------------------------------------------------

/// Dose event lifecycle status with string conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoseStatus {
    Pending,
    Taken,
    Skipped,
    Snoozed,
}

impl DoseStatus {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => STATUS_PENDING,
            Self::Taken => STATUS_TAKEN,
            Self::Skipped => STATUS_SKIPPED,
            Self::Snoozed => STATUS_SNOOZED,
        }
    }

    /// Parse from a string, returning an error for unknown statuses.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            STATUS_PENDING => Ok(Self::Pending),
            STATUS_TAKEN => Ok(Self::Taken),
            STATUS_SKIPPED => Ok(Self::Skipped),
            STATUS_SNOOZED => Ok(Self::Snoozed),
            other => Err(CoreError::Validation(format!(
                "Unknown dose status: '{other}'. Valid statuses: {}",
                VALID_STATUSES.join(", ")
            ))),
        }
    }

    /// Whether this status is terminal (no further transitions or guard
    /// writes are allowed).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Returns the set of valid target statuses reachable from `from`.
///
/// Terminal states (`taken`, `skipped`, `snoozed`) return an empty slice
/// because a resolved dose is never resolved again.
pub fn valid_transitions(from: DoseStatus) -> &'static [DoseStatus] {
    match from {
        DoseStatus::Pending => &[DoseStatus::Taken, DoseStatus::Skipped, DoseStatus::Snoozed],
        DoseStatus::Taken | DoseStatus::Skipped | DoseStatus::Snoozed => &[],
    }
}

/// Check whether a transition from `from` to `to` is valid.
pub fn can_transition(from: DoseStatus, to: DoseStatus) -> bool {
    valid_transitions(from).contains(&to)
}

/// Validate a resolution target, returning a descriptive error for
/// anything other than `taken` or `skipped`.
///
/// Snooze is a distinct operation (it re-creates the dose) and is not a
/// resolution action a caller may request through this check.
pub fn validate_resolution(to: DoseStatus) -> Result<(), CoreError> {
    match to {
        DoseStatus::Taken | DoseStatus::Skipped => Ok(()),
        other => Err(CoreError::Validation(format!(
            "'{}' is not a resolution action; expected '{STATUS_TAKEN}' or '{STATUS_SKIPPED}'",
            other.as_str()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
