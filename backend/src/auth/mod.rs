//! Authentication module: the session rotation protocol and its HTTP surface.
//!
//! `service` owns the protocol; `handlers`/`routes` are the thin axum layer
//! over it, and `middleware` guards routes that require a valid access token.

use std::sync::Arc;

use crate::auth::service::SessionService;
use crate::repositories::SqliteStore;
use crate::utils::jwt::TokenIssuer;

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;

/// Shared application state injected into the handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SessionService<SqliteStore>>,
    pub issuer: Arc<TokenIssuer>,
}
