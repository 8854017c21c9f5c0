//! Access token issuing and validation.
//!
//! The issuer holds the signing key material, built once at startup from
//! configuration; a bad key is a startup failure, never a per-request one.
//! Claims carry the subject id, default role, role set, and whichever user
//! fields the deployment configured for forwarding.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Config;
use crate::database::models::User;
use crate::errors::AuthError;

/// Claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject: the user id.
    pub sub: String,
    /// The user's default role.
    pub role: String,
    /// Full role set; may be empty.
    pub roles: Vec<String>,
    /// Configured extra fields, copied verbatim from the user record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Token expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Token issued-at timestamp (seconds since epoch).
    pub iat: i64,
}

impl AccessClaims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role == role || self.roles.iter().any(|r| r == role)
    }
}

/// Signs and validates access tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    extra_claim_fields: Vec<String>,
}

impl TokenIssuer {
    /// Builds the issuer from process-wide configuration. Called once at
    /// startup; an unusable signing key is fatal here.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        if config.jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Ok(TokenIssuer {
            encoding_key,
            decoding_key,
            validation,
            access_ttl: Duration::minutes(config.access_token_ttl_minutes),
            extra_claim_fields: config.extra_claim_fields.clone(),
        })
    }

    /// Issues a signed access token for the user. Returns the token and
    /// its expiry so callers can report both without re-decoding.
    pub fn issue(&self, user: &User) -> Result<(String, DateTime<Utc>), AuthError> {
        let now = Utc::now();
        let expires_at = now + self.access_ttl;

        let extra = self
            .extra_claim_fields
            .iter()
            .filter_map(|field| {
                user.extra
                    .get(field)
                    .map(|value| (field.clone(), value.clone()))
            })
            .collect();

        let claims = AccessClaims {
            sub: user.id.to_string(),
            role: user.default_role.clone(),
            roles: user.roles.clone(),
            extra,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token =
            encode(&Header::default(), &claims, &self.encoding_key).map_err(|_| AuthError::Signing)?;

        Ok((token, expires_at))
    }

    /// Validates signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidAccessToken)
    }
}
