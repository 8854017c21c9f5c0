//! Global application error types and handlers.
//!
//! This module defines the error taxonomy for the session protocol and the
//! store layer beneath it, and keeps the two deliberately separate: the
//! store reports connectivity problems, the service decides what the caller
//! is allowed to learn.

use thiserror::Error;

/// Failure reported by the credential/token store.
///
/// Protocol-level outcomes (duplicate username, missing token) are NOT
/// errors at this layer; they are typed results on the store operations.
/// Only connectivity and query failures end up here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {source}")]
    Unavailable {
        #[from]
        source: anyhow::Error,
    },
}

/// Errors produced by the session rotation protocol.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username or wrong password. The two cases are never
    /// distinguished so callers cannot enumerate usernames.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Registration attempted with a username that already exists.
    #[error("username already taken")]
    DuplicateUsername,

    /// Refresh token is unknown, expired, or was already consumed by a
    /// concurrent rotation. The caller must re-authenticate; retrying
    /// with the same token value can never succeed.
    #[error("invalid or expired refresh token")]
    InvalidRefreshToken,

    /// Password-reset secret does not match any user.
    #[error("invalid password reset token")]
    InvalidResetToken,

    /// Access token failed signature or expiry validation.
    #[error("invalid or expired access token")]
    InvalidAccessToken,

    /// The user exists and the password matches, but the account has not
    /// been activated and the deployment requires activation.
    #[error("user account is inactive")]
    InactiveUser,

    /// The store could not be reached. The only error class eligible for
    /// retry, and the retry belongs to the transport layer, not here.
    #[error("upstream store unavailable: {source}")]
    UpstreamUnavailable {
        #[from]
        source: StoreError,
    },

    /// Password hashing failed for reasons unrelated to input shape
    /// (entropy or resource exhaustion).
    #[error("password hashing failed")]
    Hashing,

    /// Access token could not be signed. Key material is validated at
    /// startup, so this is effectively unreachable in a healthy process.
    #[error("token signing failed")]
    Signing,

    /// Request failed caller-side validation; passed through unchanged.
    #[error("malformed input: {message}")]
    MalformedInput { message: String },
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }
}
