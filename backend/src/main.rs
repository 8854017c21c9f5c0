//! Main entry point for the auth backend.
//!
//! Initializes the axum web server, sets up the database connection and
//! token issuer, and registers the authentication routes. Key material and
//! configuration are loaded once here; a bad signing key or unreachable
//! database aborts startup.

mod api;
mod auth;
mod config;
mod database;
mod errors;
mod repositories;
mod utils;

use std::sync::Arc;

use crate::api::common::ApiResponse;
use crate::auth::AppState;
use crate::auth::service::SessionService;
use crate::repositories::SqliteStore;
use crate::utils::jwt::TokenIssuer;
use axum::{Extension, Router, response::Json, routing::get};
use config::Config;
use database::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let db = Database::new(&config).await?;

    let issuer = Arc::new(TokenIssuer::new(&config)?);
    let service = Arc::new(SessionService::new(
        SqliteStore::new(db.pool().clone()),
        Arc::clone(&issuer),
        &config,
    ));
    let state = AppState { service, issuer };

    let app = Router::new()
        .route("/", get(root_handler))
        .nest("/auth", auth::routes::auth_router())
        .layer(Extension(state));

    let bind_address = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!("Starting auth server on port {}", config.server_port);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root_handler() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        serde_json::json!({
            "service": "authgate-backend",
            "version": "0.1.0"
        }),
        "Welcome to the authgate API",
    ))
}
