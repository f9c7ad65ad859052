//! Repository for the `medications` table.

use careloop_core::types::DbId;
use sqlx::PgPool;

use crate::models::medication::{CreateMedication, Medication, UpdateMedication};

/// Column list for `medications` queries.
const COLUMNS: &str = "\
    id, user_id, name, dosage, is_critical, caregiver_phone, caregiver_email, \
    caregiver_consent, created_at, updated_at";

/// Provides CRUD operations for medications.
pub struct MedicationRepo;

impl MedicationRepo {
    /// Create a medication for a user.
    pub async fn create(
        pool: &PgPool,
        input: &CreateMedication,
    ) -> Result<Medication, sqlx::Error> {
        let query = format!(
            "INSERT INTO medications \
                (user_id, name, dosage, is_critical, caregiver_phone, caregiver_email, caregiver_consent) \
             VALUES ($1, $2, $3, COALESCE($4, false), $5, $6, COALESCE($7, false)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Medication>(&query)
            .bind(input.user_id)
            .bind(&input.name)
            .bind(&input.dosage)
            .bind(input.is_critical)
            .bind(&input.caregiver_phone)
            .bind(&input.caregiver_email)
            .bind(input.caregiver_consent)
            .fetch_one(pool)
            .await
    }

    /// Find a medication by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Medication>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM medications WHERE id = $1");
        sqlx::query_as::<_, Medication>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's medications.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Medication>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM medications \
             WHERE user_id = $1 \
             ORDER BY name"
        );
        sqlx::query_as::<_, Medication>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Patch a medication; omitted fields keep their current value.
    ///
    /// The caregiver contacts take a double `Option`: the outer level
    /// is field presence, the inner level the new value, so an explicit
    /// `null` clears the contact and disables that channel.
    ///
    /// Returns `None` if the medication does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateMedication,
    ) -> Result<Option<Medication>, sqlx::Error> {
        let query = format!(
            "UPDATE medications \
             SET name = COALESCE($2, name), \
                 dosage = COALESCE($3, dosage), \
                 is_critical = COALESCE($4, is_critical), \
                 caregiver_phone = CASE WHEN $5 THEN $6 ELSE caregiver_phone END, \
                 caregiver_email = CASE WHEN $7 THEN $8 ELSE caregiver_email END, \
                 caregiver_consent = COALESCE($9, caregiver_consent) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Medication>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.dosage)
            .bind(input.is_critical)
            .bind(input.caregiver_phone.is_some())
            .bind(input.caregiver_phone.as_ref().and_then(|v| v.as_deref()))
            .bind(input.caregiver_email.is_some())
            .bind(input.caregiver_email.as_ref().and_then(|v| v.as_deref()))
            .bind(input.caregiver_consent)
            .fetch_optional(pool)
            .await
    }
}
