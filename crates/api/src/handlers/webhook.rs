//! Inbound SMS webhook handler.
//!
//! Twilio POSTs form-encoded `{From, Body, ...}` here when a user
//! texts the service number back. Whatever happens inside the reply
//! pipeline, the sender always gets a 200 with a TwiML message; an
//! error status would make Twilio retry and the user see nothing.
//! The single exception is signature validation: a request that fails
//! it is not from Twilio at all and is refused with 403.

use axum::extract::{Form, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use careloop_core::escalation::reply_lookback_start;
use careloop_core::messages::{self, reply_ack};
use careloop_core::phone::normalize_phone;
use careloop_core::reply::parse_reply;
use careloop_db::repositories::DoseEventRepo;
use careloop_notify::twilio::twiml_message_response;

use crate::auth::signature::validate_signature;
use crate::handlers::dose::cancel_trigger;
use crate::state::AppState;

/// POST /api/v1/webhooks/sms
///
/// The form is extracted as raw pairs rather than a typed struct so
/// signature validation can cover every parameter Twilio sent, not
/// just the ones we read.
pub async fn inbound_sms(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(params): Form<Vec<(String, String)>>,
) -> Response {
    if let Err(rejection) = check_signature(&state, &headers, &params) {
        return rejection;
    }

    let from = field(&params, "From");
    let body = field(&params, "Body");

    let message = match process_reply(&state, from, body).await {
        Ok(message) => message,
        Err(e) => {
            tracing::error!(error = %e, "Inbound SMS processing failed");
            messages::REPLY_NOTHING_PENDING.to_string()
        }
    };
    twiml_response(&message)
}

/// Verify `X-Twilio-Signature` when the deployment is configured for
/// it. Validation needs both the shared auth token and the public URL
/// Twilio was given; with either missing the check is skipped.
fn check_signature(
    state: &AppState,
    headers: &HeaderMap,
    params: &[(String, String)],
) -> Result<(), Response> {
    let (Some(auth_token), Some(public_url)) = (
        state.config.twilio_auth_token.as_deref(),
        state.config.webhook_public_url.as_deref(),
    ) else {
        return Ok(());
    };

    let provided = headers
        .get("x-twilio-signature")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if validate_signature(auth_token, public_url, params, provided) {
        Ok(())
    } else {
        tracing::warn!("Rejecting inbound SMS with invalid signature");
        Err(StatusCode::FORBIDDEN.into_response())
    }
}

/// Run the reply pipeline and pick the acknowledgment to send back.
async fn process_reply(state: &AppState, from: &str, body: &str) -> Result<String, sqlx::Error> {
    let Some(phone) = normalize_phone(from) else {
        tracing::debug!(from, "Inbound SMS from unrecognizable number");
        return Ok(messages::REPLY_NOTHING_PENDING.to_string());
    };

    let Some(action) = parse_reply(body) else {
        return Ok(messages::REPLY_PROMPT.to_string());
    };

    let lookback = reply_lookback_start(Utc::now());
    let Some(dose) = DoseEventRepo::find_recent_confirmable(&state.pool, &phone, lookback).await?
    else {
        return Ok(messages::REPLY_NOTHING_PENDING.to_string());
    };

    let status = action.to_status();
    match DoseEventRepo::resolve(&state.pool, dose.id, status).await? {
        Some(resolved) => {
            tracing::info!(
                dose_id = resolved.id,
                status = %resolved.status,
                "Dose resolved via SMS reply"
            );
            cancel_trigger(state, resolved.id).await;
            Ok(reply_ack(status))
        }
        // Lost the race to the app or another reply. Nothing left to
        // acknowledge.
        None => Ok(messages::REPLY_NOTHING_PENDING.to_string()),
    }
}

fn field<'a>(params: &'a [(String, String)], name: &str) -> &'a str {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
        .unwrap_or_default()
}

fn twiml_response(message: &str) -> Response {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/xml; charset=utf-8")],
        twiml_message_response(message),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
