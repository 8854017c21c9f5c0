//! Client configuration.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the auth backend, e.g. `http://localhost:3000`.
    pub base_url: String,
    /// How long before expiry a cached access token is treated as stale.
    pub pre_expiry_margin: Duration,
    /// How often the background task checks for an upcoming expiry.
    pub renewal_interval: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            pre_expiry_margin: Duration::from_secs(60),
            renewal_interval: Duration::from_secs(60),
        }
    }
}
