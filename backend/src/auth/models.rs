//! Data structures for authentication-related entities.
//!
//! Request payloads carry their own validation rules; responses never
//! include password hashes or reset secrets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration request payload.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    pub password: String,
}

/// Login request payload.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    pub password: String,
}

/// Password reset request, keyed by the one-time secret.
#[derive(Debug, Deserialize, Validate)]
pub struct NewPasswordRequest {
    #[validate(length(min = 1, message = "Secret token is required"))]
    pub secret_token: String,

    pub new_password: String,
}

/// Claims summary returned by the `/me` endpoint.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub role: String,
    pub roles: Vec<String>,
}

/// The credential pair returned by login and refresh.
///
/// The access token is held in client memory only; the refresh token also
/// travels in an `HttpOnly` cookie so browsers carry it automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPair {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}
