//! The narrow interface the rotation service requires from the
//! credential/token store.
//!
//! Every method is one logical operation against the store. Outcomes that
//! are part of the protocol (duplicate username, token already consumed)
//! are typed variants, never parsed out of backend-specific error payloads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::models::{NewUser, RefreshTokenRow, User};
use crate::errors::StoreError;

/// Result of inserting a new user under the uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertUserOutcome {
    Inserted,
    /// The username is already taken.
    DuplicateUsername,
}

/// Result of an atomic refresh token rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// The old row was deleted and the new row inserted.
    Rotated,
    /// No row matched `(old_token, user_id)`; the token was already
    /// consumed or never existed. Nothing was written.
    NotFound,
}

/// Result of a password reset keyed by the one-time secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// Password hash replaced and secret rotated.
    Reset,
    /// The secret did not match any user.
    NotFound,
}

/// Query/mutation interface over the external credential store.
///
/// Implementations must guarantee that [`rotate_refresh_token`] is atomic:
/// under concurrent calls with the same old token, exactly one observes
/// [`RotationOutcome::Rotated`] and all others [`RotationOutcome::NotFound`].
///
/// [`rotate_refresh_token`]: UserStore::rotate_refresh_token
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn lookup_user_by_username(&self, username: &str)
    -> Result<Option<User>, StoreError>;

    async fn insert_user(&self, user: NewUser) -> Result<InsertUserOutcome, StoreError>;

    /// Looks up a refresh token together with its owning user. `None`
    /// means the token is invalid.
    async fn lookup_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<(RefreshTokenRow, User)>, StoreError>;

    async fn insert_refresh_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomically deletes the row keyed by `(old_token, user_id)` and
    /// inserts the replacement, or does neither.
    async fn rotate_refresh_token(
        &self,
        old_token: &str,
        user_id: i64,
        new_token: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<RotationOutcome, StoreError>;

    /// Deletes a refresh token row. Idempotent; deleting an unknown token
    /// is not an error.
    async fn delete_refresh_token(&self, token: &str) -> Result<(), StoreError>;

    /// Atomically replaces the password hash and rotates the reset secret
    /// for the user matching `secret_token`.
    async fn reset_password(
        &self,
        secret_token: &str,
        new_password_hash: &str,
        new_secret_token: &str,
    ) -> Result<ResetOutcome, StoreError>;
}
