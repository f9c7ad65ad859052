use axum::routing::post;
use axum::Router;

use crate::handlers::webhook;
use crate::state::AppState;

/// Routes mounted at `/webhooks`. These carry no bearer auth; the SMS
/// endpoint authenticates by Twilio signature when configured.
///
/// ```text
/// POST   /sms       -> inbound_sms (Twilio form callback, TwiML reply)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/sms", post(webhook::inbound_sms))
}
