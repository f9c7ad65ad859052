//! User entity models and DTOs.

use careloop_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `users` table.
///
/// `phone` is stored in canonical ten-digit form (see
/// `careloop_core::phone`) so inbound SMS matching is a plain equality.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub first_name: String,
    pub phone: Option<String>,
    pub device_token: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a user.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub first_name: String,
    pub phone: Option<String>,
    pub device_token: Option<String>,
}
