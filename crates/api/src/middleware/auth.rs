//! Service-token authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

/// Caller authenticated by the static service bearer token.
///
/// The API is consumed by the mobile client and internal tooling, both
/// of which carry a shared `SERVICE_TOKEN`. Use this as an extractor
/// parameter in any handler that requires it:
///
/// ```ignore
/// async fn my_handler(_auth: ServiceAuth) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
///
/// When `SERVICE_TOKEN` is unset the check is disabled (local
/// development) and every request passes.
#[derive(Debug, Clone, Copy)]
pub struct ServiceAuth;

impl FromRequestParts<AppState> for ServiceAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.service_token.as_deref() else {
            return Ok(ServiceAuth);
        };

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthorized("Invalid Authorization format. Expected: Bearer <token>".into())
        })?;

        if token != expected {
            return Err(AppError::Unauthorized("Invalid service token".into()));
        }

        Ok(ServiceAuth)
    }
}
