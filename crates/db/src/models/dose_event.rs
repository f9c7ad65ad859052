//! Dose event entity models, guard columns, and scan projections.

use careloop_core::dose::DoseStatus;
use careloop_core::error::CoreError;
use careloop_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `dose_events` table.
///
/// The six `*_sent_at` columns are write-once idempotency guards: each
/// records that its delivery channel has fired for this dose. Guards
/// are only ever set while `status = 'pending'` and are never cleared.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DoseEvent {
    pub id: DbId,
    pub user_id: DbId,
    pub medication_id: DbId,
    pub scheduled_at: Timestamp,
    pub status: String,
    pub confirmed_at: Option<Timestamp>,
    pub retry_1_sent_at: Option<Timestamp>,
    pub retry_2_sent_at: Option<Timestamp>,
    pub confirmation_sms_sent_at: Option<Timestamp>,
    pub caregiver_sms_sent_at: Option<Timestamp>,
    pub caregiver_email_sent_at: Option<Timestamp>,
    pub caregiver_call_sent_at: Option<Timestamp>,
    pub snoozed_from_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DoseEvent {
    /// Parse the raw status column into the domain enum.
    pub fn dose_status(&self) -> Result<DoseStatus, CoreError> {
        DoseStatus::from_str(&self.status)
    }
}

/// DTO for creating a dose event.
#[derive(Debug, Deserialize)]
pub struct CreateDoseEvent {
    pub user_id: DbId,
    pub medication_id: DbId,
    pub scheduled_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Guard columns
// ---------------------------------------------------------------------------

/// The write-once delivery guard columns of `dose_events`.
///
/// Naming the columns through this enum keeps the conditional-update
/// SQL in the repository injection-safe while letting every channel
/// share one code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Retry1,
    Retry2,
    ConfirmationSms,
    CaregiverSms,
    CaregiverEmail,
    CaregiverCall,
}

impl Guard {
    pub fn column(self) -> &'static str {
        match self {
            Guard::Retry1 => "retry_1_sent_at",
            Guard::Retry2 => "retry_2_sent_at",
            Guard::ConfirmationSms => "confirmation_sms_sent_at",
            Guard::CaregiverSms => "caregiver_sms_sent_at",
            Guard::CaregiverEmail => "caregiver_email_sent_at",
            Guard::CaregiverCall => "caregiver_call_sent_at",
        }
    }
}

// ---------------------------------------------------------------------------
// Scan projections (joined rows for the periodic jobs)
// ---------------------------------------------------------------------------

/// A pending dose joined with the display fields the retry poller
/// needs to build a device notification.
#[derive(Debug, Clone, FromRow)]
pub struct RetryCandidate {
    pub dose_id: DbId,
    pub user_id: DbId,
    pub scheduled_at: Timestamp,
    pub retry_1_sent_at: Option<Timestamp>,
    pub retry_2_sent_at: Option<Timestamp>,
    pub device_token: Option<String>,
    pub medication_name: String,
    pub dosage: String,
}

/// A pending critical dose joined with the contact fields the
/// confirmation dispatcher needs.
///
/// `phone` stays optional here: doses without a resolvable number are
/// logged and skipped by the job, not filtered out silently in SQL.
#[derive(Debug, Clone, FromRow)]
pub struct ConfirmationCandidate {
    pub dose_id: DbId,
    pub scheduled_at: Timestamp,
    pub phone: Option<String>,
    pub medication_name: String,
    pub dosage: String,
}

/// A pending, overdue, critical, consented dose joined with caregiver
/// contact fields and the per-channel guards.
#[derive(Debug, Clone, FromRow)]
pub struct CaregiverCandidate {
    pub dose_id: DbId,
    pub scheduled_at: Timestamp,
    pub first_name: String,
    pub caregiver_phone: Option<String>,
    pub caregiver_email: Option<String>,
    pub caregiver_sms_sent_at: Option<Timestamp>,
    pub caregiver_email_sent_at: Option<Timestamp>,
    pub caregiver_call_sent_at: Option<Timestamp>,
}
