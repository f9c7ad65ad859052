//! Shared helpers for API integration tests.
//!
//! The app under test is built by the same `build_app_router` the
//! binary uses, so every test goes through the production middleware
//! stack (CORS, request ID, timeout, panic recovery).

// Each test binary compiles this module separately and uses a subset
// of the helpers.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use careloop_api::config::ServerConfig;
use careloop_api::router::build_app_router;
use careloop_api::state::AppState;
use careloop_notify::DeviceNotifier;

/// Build a test `ServerConfig` with safe defaults.
///
/// No service token, no Twilio signature validation: individual tests
/// opt in to auth behaviour by overriding fields.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        service_token: None,
        twilio_auth_token: None,
        webhook_public_url: None,
    }
}

/// Build the application router with default test config and no device
/// trigger relay.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config(), None)
}

/// Build the application router with explicit config and an optional
/// recording notifier.
pub fn build_test_app_with(
    pool: PgPool,
    config: ServerConfig,
    notifier: Option<Arc<dyn DeviceNotifier>>,
) -> Router {
    build_app_router(AppState {
        pool,
        config: Arc::new(config),
        notifier,
    })
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send_json(app, Method::POST, uri, body).await
}

pub async fn patch_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send_json(app, Method::PATCH, uri, body).await
}

async fn send_json(app: Router, method: Method, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a form-encoded body, the shape Twilio webhooks arrive in.
pub async fn post_form(app: Router, uri: &str, fields: &[(&str, &str)]) -> Response {
    let body = serde_urlencoded::to_string(fields).unwrap();
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Assert status and decode the JSON body in one step.
pub async fn expect_json(response: Response, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}
