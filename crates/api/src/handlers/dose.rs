//! Handlers for the `/doses` resource.
//!
//! Dose mutations are compare-and-set against `status = 'pending'`: a
//! lost race means someone else resolved the dose first, and the caller
//! gets a 409 with the authoritative state rather than a silent
//! overwrite. Device trigger scheduling is best-effort in every case; a
//! relay outage never fails the store mutation it accompanies.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use careloop_core::dose::{validate_resolution, DoseStatus};
use careloop_core::error::CoreError;
use careloop_core::messages::{self, ReminderKind};
use careloop_core::types::DbId;
use careloop_db::models::dose_event::{CreateDoseEvent, DoseEvent};
use careloop_db::models::medication::Medication;
use careloop_db::models::user::User;
use careloop_db::repositories::{DoseEventRepo, MedicationRepo, UserRepo};
use careloop_notify::ReminderTrigger;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::ServiceAuth;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query / request types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /doses`.
#[derive(Debug, Deserialize)]
pub struct DoseHistoryQuery {
    pub user_id: DbId,
    pub medication_id: Option<DbId>,
    /// Maximum number of results. Defaults to 50, capped at 200.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Query parameters for `GET /doses/pending`.
#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub user_id: DbId,
}

/// Request body for `POST /doses/{id}/resolve`.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    /// `"taken"` or `"skipped"`.
    pub action: String,
}

/// Request body for `POST /doses/{id}/snooze`.
#[derive(Debug, Deserialize)]
pub struct SnoozeRequest {
    /// Minutes to push the dose out. Defaults to 15.
    pub minutes: Option<i32>,
}

/// Maximum page size for dose history listing.
const MAX_LIMIT: i64 = 200;

/// Default page size for dose history listing.
const DEFAULT_LIMIT: i64 = 50;

/// Default snooze duration in minutes.
const DEFAULT_SNOOZE_MINUTES: i32 = 15;

/// Longest allowed snooze: one day.
const MAX_SNOOZE_MINUTES: i32 = 24 * 60;

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// POST /api/v1/doses
///
/// Creates a pending dose event and schedules its initial device
/// trigger.
pub async fn create(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Json(input): Json<CreateDoseEvent>,
) -> AppResult<(StatusCode, Json<DoseEvent>)> {
    let dose = DoseEventRepo::create(&state.pool, &input).await?;
    schedule_trigger(&state, &dose, ReminderKind::Initial).await;
    Ok((StatusCode::CREATED, Json(dose)))
}

/// GET /api/v1/doses?user_id=&medication_id=
///
/// Dose history, newest first. Resolved doses are retained for audit.
pub async fn list(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Query(params): Query<DoseHistoryQuery>,
) -> AppResult<Json<Vec<DoseEvent>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = params.offset.unwrap_or(0);

    let doses = DoseEventRepo::list_for_user(
        &state.pool,
        params.user_id,
        params.medication_id,
        limit,
        offset,
    )
    .await?;
    Ok(Json(doses))
}

/// GET /api/v1/doses/pending?user_id=
///
/// The device syncs its local trigger state from this list.
pub async fn pending(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Query(params): Query<PendingQuery>,
) -> AppResult<Json<Vec<DoseEvent>>> {
    let doses = DoseEventRepo::list_pending_for_user(&state.pool, params.user_id).await?;
    Ok(Json(doses))
}

// ---------------------------------------------------------------------------
// Resolution & snooze
// ---------------------------------------------------------------------------

/// POST /api/v1/doses/{id}/resolve
///
/// Resolves a pending dose to `taken` or `skipped` and cancels its
/// device trigger. If the dose was already resolved the request fails
/// with 409 and changes nothing.
pub async fn resolve(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ResolveRequest>,
) -> AppResult<Json<DoseEvent>> {
    let to = DoseStatus::from_str(&input.action)?;
    validate_resolution(to)?;

    match DoseEventRepo::resolve(&state.pool, id, to).await? {
        Some(dose) => {
            cancel_trigger(&state, dose.id).await;
            Ok(Json(dose))
        }
        None => Err(pending_gone(&state, id).await?),
    }
}

/// POST /api/v1/doses/{id}/snooze
///
/// Cancel-and-recreate: the original dose becomes `snoozed` and a fresh
/// pending dose is created `minutes` from now with clean delivery
/// state. The old trigger is cancelled and one is scheduled for the
/// replacement.
pub async fn snooze(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SnoozeRequest>,
) -> AppResult<Json<DoseEvent>> {
    let minutes = input.minutes.unwrap_or(DEFAULT_SNOOZE_MINUTES);
    if !(1..=MAX_SNOOZE_MINUTES).contains(&minutes) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "minutes must be between 1 and {MAX_SNOOZE_MINUTES}"
        ))));
    }

    match DoseEventRepo::snooze(&state.pool, id, minutes).await? {
        Some(replacement) => {
            cancel_trigger(&state, id).await;
            schedule_trigger(&state, &replacement, ReminderKind::Initial).await;
            Ok(Json(replacement))
        }
        None => Err(pending_gone(&state, id).await?),
    }
}

/// Explain a lost compare-and-set: 409 if the dose exists in a
/// non-pending state, 404 if it never existed.
async fn pending_gone(state: &AppState, id: DbId) -> Result<AppError, AppError> {
    match DoseEventRepo::find_by_id(&state.pool, id).await? {
        Some(existing) => Ok(AppError::Core(CoreError::Conflict(format!(
            "Dose {id} is already {}",
            existing.status
        )))),
        None => Ok(AppError::Core(CoreError::NotFound {
            entity: "DoseEvent",
            id,
        })),
    }
}

// ---------------------------------------------------------------------------
// Device trigger plumbing
// ---------------------------------------------------------------------------

/// Load the user and medication a trigger's copy is built from.
async fn load_display_context(
    state: &AppState,
    dose: &DoseEvent,
) -> Result<Option<(User, Medication)>, sqlx::Error> {
    let user = UserRepo::find_by_id(&state.pool, dose.user_id).await?;
    let medication = MedicationRepo::find_by_id(&state.pool, dose.medication_id).await?;
    Ok(user.zip(medication))
}

/// Schedule a device trigger for a dose, best-effort.
async fn schedule_trigger(state: &AppState, dose: &DoseEvent, kind: ReminderKind) {
    let Some(notifier) = &state.notifier else {
        return;
    };

    let (user, medication) = match load_display_context(state, dose).await {
        Ok(Some(pair)) => pair,
        Ok(None) => {
            tracing::warn!(
                dose_id = dose.id,
                "Skipping device trigger: user or medication missing"
            );
            return;
        }
        Err(e) => {
            tracing::warn!(dose_id = dose.id, error = %e, "Skipping device trigger: lookup failed");
            return;
        }
    };

    let Some(device_token) = user.device_token else {
        tracing::debug!(
            dose_id = dose.id,
            "Skipping device trigger: user has no registered device"
        );
        return;
    };

    let trigger = ReminderTrigger {
        id: dose.id,
        device_token,
        title: messages::reminder_title(kind).to_string(),
        body: messages::reminder_body(kind, &medication.name, &medication.dosage),
        fire_at: dose.scheduled_at,
        kind,
    };
    if let Err(e) = notifier.schedule(&trigger).await {
        tracing::warn!(dose_id = dose.id, error = %e, "Device trigger scheduling failed");
    }
}

/// Cancel the device trigger for a dose, best-effort.
pub(crate) async fn cancel_trigger(state: &AppState, dose_id: DbId) {
    let Some(notifier) = &state.notifier else {
        return;
    };
    if let Err(e) = notifier.cancel(dose_id).await {
        tracing::warn!(dose_id, error = %e, "Device trigger cancellation failed");
    }
}
