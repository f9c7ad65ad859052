//! Handlers for the `/users` resource.
//!
//! Account management lives outside this service; these endpoints carry
//! the minimum the escalation subsystem needs (identity, phone for SMS
//! matching, device token for push triggers).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use careloop_core::error::CoreError;
use careloop_core::phone::normalize_phone;
use careloop_core::types::DbId;
use careloop_db::models::user::{CreateUser, User};
use careloop_db::repositories::UserRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::ServiceAuth;
use crate::state::AppState;

/// POST /api/v1/users
///
/// Phone numbers are stored in canonical 10-digit form so inbound SMS
/// senders can be matched by plain equality.
pub async fn create(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Json(mut input): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    if input.first_name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "first_name must not be empty".into(),
        )));
    }

    if let Some(raw) = &input.phone {
        let canonical = normalize_phone(raw).ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "Unrecognized phone number: {raw}"
            )))
        })?;
        input.phone = Some(canonical);
    }

    let user = UserRepo::create(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/v1/users/{id}
pub async fn get_by_id(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<User>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;
    Ok(Json(user))
}
