//! Handlers for the `/medications` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use careloop_core::error::CoreError;
use careloop_core::phone::normalize_phone;
use careloop_core::types::DbId;
use careloop_db::models::medication::{CreateMedication, Medication, UpdateMedication};
use careloop_db::repositories::MedicationRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::ServiceAuth;
use crate::state::AppState;

/// Query parameters for `GET /medications`.
#[derive(Debug, Deserialize)]
pub struct MedicationQuery {
    pub user_id: DbId,
}

/// POST /api/v1/medications
pub async fn create(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Json(mut input): Json<CreateMedication>,
) -> AppResult<(StatusCode, Json<Medication>)> {
    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "name must not be empty".into(),
        )));
    }
    if input.dosage.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "dosage must not be empty".into(),
        )));
    }
    input.caregiver_phone = canonical_caregiver_phone(input.caregiver_phone)?;

    let medication = MedicationRepo::create(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(medication)))
}

/// GET /api/v1/medications?user_id=
pub async fn list(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Query(params): Query<MedicationQuery>,
) -> AppResult<Json<Vec<Medication>>> {
    let medications = MedicationRepo::list_for_user(&state.pool, params.user_id).await?;
    Ok(Json(medications))
}

/// GET /api/v1/medications/{id}
pub async fn get_by_id(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Medication>> {
    let medication = MedicationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Medication",
            id,
        }))?;
    Ok(Json(medication))
}

/// PATCH /api/v1/medications/{id}
///
/// Partial update; this is also how caregiver consent is granted and
/// revoked, and how a caregiver contact is removed (explicit `null`).
pub async fn update(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateMedication>,
) -> AppResult<Json<Medication>> {
    // Only a new value gets normalized; `Some(None)` passes through to
    // clear the contact.
    if let Some(Some(raw)) = &input.caregiver_phone {
        let canonical = canonical_caregiver_phone(Some(raw.clone()))?;
        input.caregiver_phone = Some(canonical);
    }

    let medication = MedicationRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Medication",
            id,
        }))?;
    Ok(Json(medication))
}

/// Normalize a caregiver phone number to canonical 10-digit form.
fn canonical_caregiver_phone(raw: Option<String>) -> Result<Option<String>, AppError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let canonical = normalize_phone(&raw).ok_or_else(|| {
        AppError::Core(CoreError::Validation(format!(
            "Unrecognized caregiver phone number: {raw}"
        )))
    })?;
    Ok(Some(canonical))
}
