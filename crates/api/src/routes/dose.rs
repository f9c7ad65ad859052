use axum::routing::{get, post};
use axum::Router;

use crate::handlers::dose;
use crate::state::AppState;

/// Routes mounted at `/doses`.
///
/// ```text
/// GET    /               -> list     (?user_id&medication_id&limit&offset)
/// POST   /               -> create
/// GET    /pending        -> pending  (?user_id)
/// POST   /{id}/resolve   -> resolve  (taken | skipped)
/// POST   /{id}/snooze    -> snooze   (cancel-and-recreate)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dose::list).post(dose::create))
        .route("/pending", get(dose::pending))
        .route("/{id}/resolve", post(dose::resolve))
        .route("/{id}/snooze", post(dose::snooze))
}
