//! Repository for the `dose_events` table.
//!
//! Every mutation here is a conditional single-row update so the
//! at-least-once jobs stay safe under overlapping runs:
//! - resolution re-checks `status = 'pending'` in the same statement
//!   that sets the terminal status and `confirmed_at`;
//! - each delivery guard is set through one compare-and-set that
//!   re-checks both `status = 'pending'` and guard-is-null.
//!
//! A conditional update that matches zero rows is a safe no-op, never
//! an error: the other writer won.

use careloop_core::dose::DoseStatus;
use careloop_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::dose_event::{
    CaregiverCandidate, ConfirmationCandidate, CreateDoseEvent, DoseEvent, Guard, RetryCandidate,
};

/// Column list for `dose_events` queries.
const COLUMNS: &str = "\
    id, user_id, medication_id, scheduled_at, status, confirmed_at, \
    retry_1_sent_at, retry_2_sent_at, confirmation_sms_sent_at, \
    caregiver_sms_sent_at, caregiver_email_sent_at, caregiver_call_sent_at, \
    snoozed_from_id, created_at, updated_at";

/// Same list qualified with the `d.` alias for joined queries.
const JOINED_COLUMNS: &str = "\
    d.id, d.user_id, d.medication_id, d.scheduled_at, d.status, d.confirmed_at, \
    d.retry_1_sent_at, d.retry_2_sent_at, d.confirmation_sms_sent_at, \
    d.caregiver_sms_sent_at, d.caregiver_email_sent_at, d.caregiver_call_sent_at, \
    d.snoozed_from_id, d.created_at, d.updated_at";

/// Provides CRUD and escalation-scan operations for dose events.
pub struct DoseEventRepo;

impl DoseEventRepo {
    /// Create a dose event in the initial `pending` state.
    pub async fn create(pool: &PgPool, input: &CreateDoseEvent) -> Result<DoseEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO dose_events (user_id, medication_id, scheduled_at) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DoseEvent>(&query)
            .bind(input.user_id)
            .bind(input.medication_id)
            .bind(input.scheduled_at)
            .fetch_one(pool)
            .await
    }

    /// Find a dose event by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DoseEvent>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM dose_events WHERE id = $1");
        sqlx::query_as::<_, DoseEvent>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's dose events, optionally filtered to one medication.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        medication_id: Option<DbId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DoseEvent>, sqlx::Error> {
        let filter = if medication_id.is_some() {
            "AND medication_id = $4"
        } else {
            ""
        };
        let query = format!(
            "SELECT {COLUMNS} FROM dose_events \
             WHERE user_id = $1 {filter} \
             ORDER BY scheduled_at DESC \
             LIMIT $2 OFFSET $3"
        );
        let mut q = sqlx::query_as::<_, DoseEvent>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset);
        if let Some(medication_id) = medication_id {
            q = q.bind(medication_id);
        }
        q.fetch_all(pool).await
    }

    /// List a user's pending doses, oldest first.
    pub async fn list_pending_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<DoseEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM dose_events \
             WHERE user_id = $1 AND status = 'pending' \
             ORDER BY scheduled_at"
        );
        sqlx::query_as::<_, DoseEvent>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Resolve a pending dose to a terminal status, setting `confirmed_at`.
    ///
    /// The status check and the write happen in one statement, so under
    /// concurrent resolution attempts exactly one caller gets the row
    /// back; every other caller gets `None` and must treat it as an
    /// already-resolved no-op.
    pub async fn resolve(
        pool: &PgPool,
        id: DbId,
        to: DoseStatus,
    ) -> Result<Option<DoseEvent>, sqlx::Error> {
        let query = format!(
            "UPDATE dose_events \
             SET status = $2, confirmed_at = NOW() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DoseEvent>(&query)
            .bind(id)
            .bind(to.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Snooze a pending dose for `minutes`.
    ///
    /// Cancel-and-recreate in one transaction: the original row becomes
    /// terminal `snoozed` (conditionally, so a lost race is a no-op) and
    /// a fresh `pending` row is inserted due `minutes` from now with all
    /// guards unset and `snoozed_from_id` recording the lineage.
    ///
    /// Returns the replacement dose, or `None` if the original was no
    /// longer pending.
    pub async fn snooze(
        pool: &PgPool,
        id: DbId,
        minutes: i32,
    ) -> Result<Option<DoseEvent>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let original: Option<(DbId, DbId)> = sqlx::query_as(
            "UPDATE dose_events \
             SET status = 'snoozed', confirmed_at = NOW() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING user_id, medication_id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id, medication_id)) = original else {
            return Ok(None);
        };

        let query = format!(
            "INSERT INTO dose_events (user_id, medication_id, scheduled_at, snoozed_from_id) \
             VALUES ($1, $2, NOW() + make_interval(mins => $3), $4) \
             RETURNING {COLUMNS}"
        );
        let replacement = sqlx::query_as::<_, DoseEvent>(&query)
            .bind(user_id)
            .bind(medication_id)
            .bind(minutes)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(replacement))
    }

    // -----------------------------------------------------------------------
    // Delivery guards
    // -----------------------------------------------------------------------

    /// Set a delivery guard, compare-and-set style.
    ///
    /// Returns `true` if this call set the guard, `false` if the dose
    /// was no longer pending or the guard was already set. Callers must
    /// treat `false` as "someone else handled it", not a failure.
    pub async fn mark_sent(pool: &PgPool, id: DbId, guard: Guard) -> Result<bool, sqlx::Error> {
        let column = guard.column();
        let query = format!(
            "UPDATE dose_events \
             SET {column} = NOW() \
             WHERE id = $1 AND status = 'pending' AND {column} IS NULL"
        );
        let result = sqlx::query(&query).bind(id).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Escalation scans
    // -----------------------------------------------------------------------

    /// Pending doses in the local retry window `(start, end]`, joined
    /// with device and display fields.
    ///
    /// The window is a prefilter; the poller still decides the exact
    /// tier per dose and the guard update re-checks everything.
    pub async fn list_retry_candidates(
        pool: &PgPool,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<RetryCandidate>, sqlx::Error> {
        sqlx::query_as::<_, RetryCandidate>(
            "SELECT d.id AS dose_id, d.user_id, d.scheduled_at, \
                    d.retry_1_sent_at, d.retry_2_sent_at, \
                    u.device_token, m.name AS medication_name, m.dosage \
             FROM dose_events d \
             JOIN users u ON u.id = d.user_id \
             JOIN medications m ON m.id = d.medication_id \
             WHERE d.status = 'pending' \
               AND d.scheduled_at > $1 AND d.scheduled_at <= $2 \
               AND (d.retry_1_sent_at IS NULL OR d.retry_2_sent_at IS NULL) \
             ORDER BY d.scheduled_at",
        )
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
    }

    /// Pending critical doses due within `[start, end]` whose
    /// confirmation SMS has not been sent.
    pub async fn list_confirmation_candidates(
        pool: &PgPool,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<ConfirmationCandidate>, sqlx::Error> {
        sqlx::query_as::<_, ConfirmationCandidate>(
            "SELECT d.id AS dose_id, d.scheduled_at, u.phone, \
                    m.name AS medication_name, m.dosage \
             FROM dose_events d \
             JOIN users u ON u.id = d.user_id \
             JOIN medications m ON m.id = d.medication_id \
             WHERE d.status = 'pending' \
               AND m.is_critical = true \
               AND d.confirmation_sms_sent_at IS NULL \
               AND d.scheduled_at >= $1 AND d.scheduled_at <= $2 \
             ORDER BY d.scheduled_at",
        )
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
    }

    /// Pending critical, consented doses scheduled at or before
    /// `cutoff` with at least one caregiver channel still unsent.
    ///
    /// The voice guard only counts as an open channel when the
    /// deployment places calls; otherwise a dose whose SMS and email
    /// went out would stay a candidate on every scan with nothing
    /// left to send.
    pub async fn list_caregiver_candidates(
        pool: &PgPool,
        cutoff: Timestamp,
        voice_calls_enabled: bool,
    ) -> Result<Vec<CaregiverCandidate>, sqlx::Error> {
        sqlx::query_as::<_, CaregiverCandidate>(
            "SELECT d.id AS dose_id, d.scheduled_at, u.first_name, \
                    m.caregiver_phone, m.caregiver_email, \
                    d.caregiver_sms_sent_at, d.caregiver_email_sent_at, d.caregiver_call_sent_at \
             FROM dose_events d \
             JOIN users u ON u.id = d.user_id \
             JOIN medications m ON m.id = d.medication_id \
             WHERE d.status = 'pending' \
               AND m.is_critical = true \
               AND m.caregiver_consent = true \
               AND d.scheduled_at <= $1 \
               AND (d.caregiver_sms_sent_at IS NULL \
                    OR d.caregiver_email_sent_at IS NULL \
                    OR ($2 AND d.caregiver_call_sent_at IS NULL)) \
             ORDER BY d.scheduled_at",
        )
        .bind(cutoff)
        .bind(voice_calls_enabled)
        .fetch_all(pool)
        .await
    }

    /// The most recently scheduled pending dose an inbound reply from
    /// `phone` may resolve: confirmation SMS already sent, scheduled
    /// within the lookback.
    pub async fn find_recent_confirmable(
        pool: &PgPool,
        phone: &str,
        lookback_start: Timestamp,
    ) -> Result<Option<DoseEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} \
             FROM dose_events d \
             JOIN users u ON u.id = d.user_id \
             WHERE u.phone = $1 \
               AND d.status = 'pending' \
               AND d.confirmation_sms_sent_at IS NOT NULL \
               AND d.scheduled_at >= $2 \
             ORDER BY d.scheduled_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, DoseEvent>(&query)
            .bind(phone)
            .bind(lookback_start)
            .fetch_optional(pool)
            .await
    }
}
