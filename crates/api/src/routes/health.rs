//! Service health probe, mounted at the root rather than under the
//! versioned API so monitors can hit it without a bearer token.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
    database: &'static str,
}

/// GET /health
///
/// Always answers 200: an unreachable database makes the service
/// `degraded`, not dead, and the escalation jobs keep retrying.
async fn health(State(state): State<AppState>) -> Json<Health> {
    let database_up = careloop_db::health_check(&state.pool).await.is_ok();

    Json(Health {
        status: if database_up { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database: if database_up { "up" } else { "down" },
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
