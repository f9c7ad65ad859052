//! Inbound SMS reply vocabulary.

use crate::dose::DoseStatus;

/// Recognized reply keywords and the resolution each maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyAction {
    Taken,
    Skipped,
}

impl ReplyAction {
    /// The terminal status this reply resolves a pending dose to.
    pub fn to_status(self) -> DoseStatus {
        match self {
            ReplyAction::Taken => DoseStatus::Taken,
            ReplyAction::Skipped => DoseStatus::Skipped,
        }
    }
}

/// Parse an inbound SMS body into a reply action.
///
/// Matching is case-insensitive after trimming surrounding whitespace.
/// The vocabulary is deliberately tiny: `TAKEN`, `SKIP`, `SKIPPED`.
/// Anything else returns `None` and the sender is re-prompted.
pub fn parse_reply(body: &str) -> Option<ReplyAction> {
    match body.trim().to_ascii_uppercase().as_str() {
        "TAKEN" => Some(ReplyAction::Taken),
        "SKIP" | "SKIPPED" => Some(ReplyAction::Skipped),
        _ => None,
    }
}
