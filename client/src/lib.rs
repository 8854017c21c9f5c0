//! Client-side session management for the auth backend.
//!
//! Holds the short-lived access token in process memory only, silently
//! refreshes it before expiry over the `HttpOnly` refresh cookie, and
//! synchronizes logout across instances through a publish/observe channel.
//! The cache is an explicitly owned object with an explicit lifecycle:
//! created on first need, cleared on logout or fatal refresh failure.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod session;
pub mod transport;

pub use broadcast::{LogoutChannel, MemoryLogoutChannel};
pub use config::ClientConfig;
pub use error::ClientError;
pub use session::SessionCache;
pub use transport::{AuthTransport, HttpTransport, SessionPair, TransportError};
