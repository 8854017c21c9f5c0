//! The in-memory session cache.
//!
//! Owns the current access token and its expiry, refreshing it silently
//! before the pre-expiry margin is reached. A foreground [`acquire`] and
//! the background renewal task share one in-flight-refresh guard, so two
//! near-simultaneous expiry-triggered refreshes never each rotate the
//! refresh token. Logout clears local state, revokes the token server-side,
//! and publishes a marker so every other instance clears too.
//!
//! [`acquire`]: SessionCache::acquire

use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::broadcast::LogoutChannel;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::transport::{AuthTransport, TransportError};

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Process-local cache of the current access token.
///
/// Explicitly owned, not global: create one per client instance, pass it
/// to whatever issues authenticated requests, and drop it (or call
/// [`logout`]) to tear the session down.
///
/// [`logout`]: SessionCache::logout
pub struct SessionCache {
    inner: Arc<Inner>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
    transport: Arc<dyn AuthTransport>,
    channel: Arc<dyn LogoutChannel>,
    margin: Duration,
    renewal_interval: std::time::Duration,
    state: Mutex<Option<CachedToken>>,
    /// Serializes the slow path; the winner refreshes, losers observe the
    /// winner's result through the double-check after acquisition.
    refresh_gate: tokio::sync::Mutex<()>,
    renewal: Mutex<Option<JoinHandle<()>>>,
}

impl SessionCache {
    /// Creates the cache and starts observing the logout channel. No
    /// network traffic happens until login or acquire.
    pub fn new(
        transport: Arc<dyn AuthTransport>,
        channel: Arc<dyn LogoutChannel>,
        config: &ClientConfig,
    ) -> Self {
        let margin = Duration::from_std(config.pre_expiry_margin)
            .unwrap_or_else(|_| Duration::seconds(60));

        let inner = Arc::new(Inner {
            transport,
            channel: Arc::clone(&channel),
            margin,
            renewal_interval: config.renewal_interval,
            state: Mutex::new(None),
            refresh_gate: tokio::sync::Mutex::new(()),
            renewal: Mutex::new(None),
        });

        let weak = Arc::downgrade(&inner);
        let mut rx = channel.subscribe();
        let listener = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let Some(inner) = weak.upgrade() else { break };
                inner.state.lock().unwrap().take();
                debug!("logout observed; local session cleared");
            }
        });

        SessionCache {
            inner,
            listener: Mutex::new(Some(listener)),
        }
    }

    /// Authenticates, primes the cache, and starts background renewal.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let pair = self
            .inner
            .transport
            .login(username, password)
            .await
            .map_err(to_client_error)?;

        *self.inner.state.lock().unwrap() = Some(CachedToken {
            access_token: pair.access_token,
            expires_at: pair.access_token_expires_at,
        });
        self.start_renewal();
        Ok(())
    }

    /// Returns an access token good for at least the pre-expiry margin.
    ///
    /// The common path is a lock-and-clone with no network traffic. The
    /// slow path runs a single refresh shared with the background task and
    /// with any concurrent acquire.
    pub async fn acquire(&self) -> Result<String, ClientError> {
        if let Some(token) = self.inner.fresh_token() {
            return Ok(token);
        }
        Inner::refresh_through_gate(&self.inner).await
    }

    /// The cached token, if present and outside the pre-expiry margin.
    /// Never touches the network.
    pub fn current_token(&self) -> Option<String> {
        self.inner.fresh_token()
    }

    /// Clears local state, revokes the refresh token server-side, and
    /// broadcasts the logout to other instances.
    ///
    /// Local and cross-instance teardown happen regardless of whether the
    /// server was reachable; only a transport failure is reported.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.inner.state.lock().unwrap().take();
        if let Some(handle) = self.inner.renewal.lock().unwrap().take() {
            handle.abort();
        }

        let result = self.inner.transport.logout().await;
        self.inner.channel.publish();

        match result {
            Ok(()) | Err(TransportError::Rejected) => Ok(()),
            Err(TransportError::Unavailable(e)) => Err(ClientError::Unavailable(e)),
        }
    }

    fn start_renewal(&self) {
        let mut slot = self.inner.renewal.lock().unwrap();
        if slot.is_some() {
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let interval = self.inner.renewal_interval;
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if inner.needs_renewal() {
                    if let Err(e) = Inner::refresh_through_gate(&inner).await {
                        debug!("background renewal failed: {e}");
                    }
                }
            }
        }));
    }
}

impl Drop for SessionCache {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.lock().unwrap().take() {
            handle.abort();
        }
        if let Some(handle) = self.inner.renewal.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Inner {
    fn fresh_token(&self) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .as_ref()
            .filter(|token| token.expires_at - self.margin > Utc::now())
            .map(|token| token.access_token.clone())
    }

    fn needs_renewal(&self) -> bool {
        // A missing token means logged out; nothing to renew.
        let state = self.state.lock().unwrap();
        state
            .as_ref()
            .is_some_and(|token| token.expires_at - self.margin <= Utc::now())
    }

    async fn refresh_through_gate(inner: &Arc<Inner>) -> Result<String, ClientError> {
        let _gate = inner.refresh_gate.lock().await;

        // A concurrent refresh may have won while we waited.
        if let Some(token) = inner.fresh_token() {
            return Ok(token);
        }

        match inner.transport.refresh().await {
            Ok(pair) => {
                let access_token = pair.access_token.clone();
                *inner.state.lock().unwrap() = Some(CachedToken {
                    access_token: pair.access_token,
                    expires_at: pair.access_token_expires_at,
                });
                Ok(access_token)
            }
            Err(e) => {
                // Failed refresh invalidates whatever was cached.
                inner.state.lock().unwrap().take();
                Err(to_client_error(e))
            }
        }
    }
}

fn to_client_error(error: TransportError) -> ClientError {
    match error {
        TransportError::Rejected => ClientError::MustReauthenticate,
        TransportError::Unavailable(e) => ClientError::Unavailable(e),
    }
}
