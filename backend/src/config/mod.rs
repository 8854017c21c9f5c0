//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the database URL, token lifetimes, signing secret, and the behavioral
//! switches of the registration/login flow. Configuration is loaded once at
//! startup and treated as immutable afterwards.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    /// Secret for signing access tokens (HS256).
    pub jwt_secret: String,
    /// Access token lifetime in minutes.
    pub access_token_ttl_minutes: i64,
    /// Refresh token lifetime in minutes.
    pub refresh_token_ttl_minutes: i64,
    /// bcrypt cost factor for password hashing.
    pub bcrypt_cost: u32,
    /// Role assigned to newly registered users.
    pub default_role: String,
    /// Whether newly registered users are active without a separate
    /// activation step.
    pub registration_auto_active: bool,
    /// Whether login is refused for inactive users.
    pub require_active_users: bool,
    /// User fields copied verbatim into access token claims.
    pub extra_claim_fields: Vec<String>,
    pub server_port: u16,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid number")?;

        let acquire_timeout_seconds = env::var("DB_ACQUIRE_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u64>()
            .context("DB_ACQUIRE_TIMEOUT_SECONDS must be a valid number")?;

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET not set")?;

        let access_token_ttl_minutes = env::var("ACCESS_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse::<i64>()
            .context("ACCESS_TOKEN_TTL_MINUTES must be a valid number")?;

        // 30 days by default.
        let refresh_token_ttl_minutes = env::var("REFRESH_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "43200".to_string())
            .parse::<i64>()
            .context("REFRESH_TOKEN_TTL_MINUTES must be a valid number")?;

        let bcrypt_cost = env::var("BCRYPT_COST")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .context("BCRYPT_COST must be a valid number")?;

        let default_role = env::var("DEFAULT_ROLE").unwrap_or_else(|_| "user".to_string());

        let registration_auto_active = env::var("REGISTRATION_AUTO_ACTIVE")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .context("REGISTRATION_AUTO_ACTIVE must be true or false")?;

        let require_active_users = env::var("REQUIRE_ACTIVE_USERS")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .context("REQUIRE_ACTIVE_USERS must be true or false")?;

        let extra_claim_fields = env::var("EXTRA_CLAIM_FIELDS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect();

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVER_PORT must be a valid number")?;

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            jwt_secret,
            access_token_ttl_minutes,
            refresh_token_ttl_minutes,
            bcrypt_cost,
            default_role,
            registration_auto_active,
            require_active_users,
            extra_claim_fields,
            server_port,
        })
    }
}
