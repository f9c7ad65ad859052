use axum::routing::get;
use axum::Router;

use crate::handlers::medication;
use crate::state::AppState;

/// Routes mounted at `/medications`.
///
/// ```text
/// GET    /          -> list  (?user_id)
/// POST   /          -> create
/// GET    /{id}      -> get_by_id
/// PATCH  /{id}      -> update (also grants/revokes caregiver consent)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(medication::list).post(medication::create))
        .route(
            "/{id}",
            get(medication::get_by_id).patch(medication::update),
        )
}
