//! Data structures for the credential store entities.
//!
//! These are the records the rotation protocol operates on: the user
//! identity row and the single-use refresh token row bound to it.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Identity record for a registered user.
///
/// `password_hash` and `secret_token` are opaque credentials; they are
/// never serialized into responses and never logged.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub active: bool,
    pub default_role: String,
    /// Additional roles beyond the default; may be empty.
    pub roles: Vec<String>,
    /// Configurable fields forwarded verbatim into access token claims.
    pub extra: Map<String, Value>,
    /// One-time secret for the password reset flow; rotated on every use.
    pub secret_token: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub active: bool,
    pub default_role: String,
    pub secret_token: String,
}

/// A single-use refresh token row.
///
/// At most one valid row exists per token value; rotation deletes the row
/// and inserts a replacement with a fresh value, atomically.
#[derive(Debug, Clone)]
pub struct RefreshTokenRow {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRow {
    /// A token whose `expires_at` equals "now" is already expired
    /// (inclusive boundary).
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_boundary_is_inclusive() {
        let now = Utc::now();
        let row = RefreshTokenRow {
            token: "t".into(),
            user_id: 1,
            expires_at: now,
            created_at: now - Duration::minutes(5),
        };
        assert!(row.is_expired(now));

        let row = RefreshTokenRow {
            expires_at: now + Duration::seconds(1),
            ..row
        };
        assert!(!row.is_expired(now));
    }
}
