pub mod dose;
pub mod health;
pub mod medication;
pub mod user;
pub mod webhook;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /users                    create (POST)
/// /users/{id}               get
///
/// /medications              list (?user_id), create
/// /medications/{id}         get, update (PATCH)
///
/// /doses                    list (?user_id&medication_id&limit&offset), create
/// /doses/pending            pending sync list (?user_id)
/// /doses/{id}/resolve       resolve to taken/skipped (POST)
/// /doses/{id}/snooze        cancel-and-recreate later (POST)
///
/// /webhooks/sms             Twilio inbound SMS callback (POST, no bearer)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Patient accounts and device registration.
        .nest("/users", user::router())
        // Medication records, caregiver contacts and consent.
        .nest("/medications", medication::router())
        // Dose events: scheduling, sync, resolution, snooze.
        .nest("/doses", dose::router())
        // Inbound SMS replies (signature-authenticated, not bearer).
        .nest("/webhooks", webhook::router())
}
