//! Defines the HTTP routes for authentication.
//!
//! These routes cover registration, login, silent refresh, logout, and
//! password reset, and are designed to be nested into the main axum router.

use crate::auth::handlers::*;
use crate::auth::middleware::access_auth;
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Creates the authentication router with all auth-related routes.
pub fn auth_router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/new-password", post(new_password))
        .route("/me", get(me).layer(middleware::from_fn(access_auth)))
}
