//! Integration tests for `/api/v1/users`.

mod common;

use axum::http::StatusCode;
use common::{body_json, expect_json, get, post_json};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Test: create stores the canonical phone form
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_user_normalizes_phone(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(
        app.clone(),
        "/api/v1/users",
        json!({
            "first_name": "Ada",
            "phone": "(770) 401-8565",
            "device_token": "device-abc",
        }),
    )
    .await;
    let user = expect_json(response, StatusCode::CREATED).await;

    assert_eq!(user["first_name"], "Ada");
    assert_eq!(user["phone"], "7704018565");
    assert_eq!(user["device_token"], "device-abc");

    // Round-trip through GET.
    let id = user["id"].as_i64().unwrap();
    let fetched = body_json(get(app, &format!("/api/v1/users/{id}")).await).await;
    assert_eq!(fetched["phone"], "7704018565");
}

// ---------------------------------------------------------------------------
// Test: phone and device token are optional
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_user_without_phone_is_allowed(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(app, "/api/v1/users", json!({"first_name": "Grace"})).await;
    let user = expect_json(response, StatusCode::CREATED).await;

    assert_eq!(user["first_name"], "Grace");
    assert!(user["phone"].is_null());
    assert!(user["device_token"].is_null());
}

// ---------------------------------------------------------------------------
// Test: blank first name is rejected
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_user_rejects_blank_first_name(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(app, "/api/v1/users", json!({"first_name": "   "})).await;
    let body = expect_json(response, StatusCode::BAD_REQUEST).await;

    assert_eq!(body["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Test: unparseable phone is rejected, not stored raw
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_user_rejects_malformed_phone(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/users",
        json!({"first_name": "Ada", "phone": "40185"}),
    )
    .await;
    let body = expect_json(response, StatusCode::BAD_REQUEST).await;

    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("Unrecognized phone number"),
        "got: {}",
        body["error"]
    );
}

// ---------------------------------------------------------------------------
// Test: two users cannot share a phone number
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_phone_returns_409(pool: PgPool) {
    let app = common::build_test_app(pool);

    let first = post_json(
        app.clone(),
        "/api/v1/users",
        json!({"first_name": "Ada", "phone": "7704018565"}),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    // Same number in a different spelling still collides.
    let second = post_json(
        app,
        "/api/v1/users",
        json!({"first_name": "Grace", "phone": "+17704018565"}),
    )
    .await;
    let body = expect_json(second, StatusCode::CONFLICT).await;
    assert_eq!(body["code"], "CONFLICT");
}

// ---------------------------------------------------------------------------
// Test: missing user returns 404
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn get_missing_user_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get(app, "/api/v1/users/9999").await;
    let body = expect_json(response, StatusCode::NOT_FOUND).await;

    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["error"], "User with id 9999 not found");
}
