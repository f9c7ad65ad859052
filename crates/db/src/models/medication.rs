//! Medication entity models and DTOs.

use careloop_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `medications` table.
///
/// Caregiver escalation for doses of this medication requires both
/// `is_critical` and `caregiver_consent`; a missing contact channel
/// disables that channel only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Medication {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub dosage: String,
    pub is_critical: bool,
    pub caregiver_phone: Option<String>,
    pub caregiver_email: Option<String>,
    pub caregiver_consent: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a medication.
#[derive(Debug, Deserialize)]
pub struct CreateMedication {
    pub user_id: DbId,
    pub name: String,
    pub dosage: String,
    pub is_critical: Option<bool>,
    pub caregiver_phone: Option<String>,
    pub caregiver_email: Option<String>,
    pub caregiver_consent: Option<bool>,
}

/// DTO for patching a medication.
///
/// The caregiver contact fields are double-`Option` so a PATCH body
/// can distinguish an omitted field (keep the current contact) from an
/// explicit `null` (remove the contact, disabling that channel).
#[derive(Debug, Deserialize)]
pub struct UpdateMedication {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub is_critical: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub caregiver_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub caregiver_email: Option<Option<String>>,
    pub caregiver_consent: Option<bool>,
}

/// A field that is present deserializes to `Some(..)`, even when its
/// value is `null`; a missing field takes the `default` of `None`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
