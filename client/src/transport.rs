//! The network boundary between the session cache and the auth backend.
//!
//! The cache only sees the [`AuthTransport`] trait; the HTTP implementation
//! carries the refresh token in an `HttpOnly` cookie managed by reqwest's
//! cookie store, so the token value never passes through caller code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-level failure, split along the one line that matters for the
/// caller: "the server said no" versus "the server could not be reached".
#[derive(Debug, Error)]
pub enum TransportError {
    /// The auth service actively rejected the request (credentials,
    /// session, or token). Not retryable.
    #[error("request rejected by the auth service")]
    Rejected,

    /// The auth service could not be reached or answered with a server
    /// error. The only retry-eligible class.
    #[error("transport failure: {0}")]
    Unavailable(String),
}

/// The credential pair returned by login and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionPair {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// Calls into the auth backend.
#[async_trait]
pub trait AuthTransport: Send + Sync {
    async fn login(&self, username: &str, password: &str)
    -> Result<SessionPair, TransportError>;

    /// Exchange the refresh cookie for a new session pair.
    async fn refresh(&self) -> Result<SessionPair, TransportError>;

    /// Revoke the refresh token behind the cookie. Idempotent server-side.
    async fn logout(&self) -> Result<(), TransportError>;
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

/// HTTP transport over reqwest with an in-memory cookie store.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        Ok(HttpTransport {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    async fn parse_pair(response: reqwest::Response) -> Result<SessionPair, TransportError> {
        match response.status() {
            status if status.is_success() => response
                .json::<SessionPair>()
                .await
                .map_err(|e| TransportError::Unavailable(e.to_string())),
            status if status.is_client_error() => Err(TransportError::Rejected),
            status => Err(TransportError::Unavailable(format!(
                "unexpected status {status}"
            ))),
        }
    }
}

#[async_trait]
impl AuthTransport for HttpTransport {
    async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionPair, TransportError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginBody { username, password })
            .send()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        Self::parse_pair(response).await
    }

    async fn refresh(&self) -> Result<SessionPair, TransportError> {
        let response = self
            .client
            .post(self.url("/auth/refresh"))
            .send()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        Self::parse_pair(response).await
    }

    async fn logout(&self) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.url("/auth/logout"))
            .send()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            status if status.is_client_error() => Err(TransportError::Rejected),
            status => Err(TransportError::Unavailable(format!(
                "unexpected status {status}"
            ))),
        }
    }
}
