//! Error types surfaced to users of the session cache.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The auth service rejected the credentials or the session. The
    /// cached token has been cleared; the user must log in again. Never
    /// retry the failed call with the same inputs.
    #[error("credentials or session rejected; re-authentication required")]
    MustReauthenticate,

    /// The auth service could not be reached. Whether and when to retry
    /// is the caller's decision; the cache does not retry internally.
    #[error("auth service unavailable: {0}")]
    Unavailable(String),
}
