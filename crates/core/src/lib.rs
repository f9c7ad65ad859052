//! Careloop domain core.
//!
//! Pure domain logic with zero internal dependencies so it can be used by
//! the repository layer, the API, and the escalation worker alike:
//!
//! - [`dose`] — dose event status constants and the resolution state machine.
//! - [`escalation`] — escalation tiers, timing windows, and the policy
//!   struct passed into every job invocation.
//! - [`phone`] — phone number normalization for inbound reply matching.
//! - [`reply`] — the accepted inbound SMS vocabulary (TAKEN / SKIP).
//! - [`messages`] — outbound message copy, including the privacy-minimized
//!   caregiver bodies.

pub mod dose;
pub mod error;
pub mod escalation;
pub mod messages;
pub mod phone;
pub mod reply;
pub mod types;
