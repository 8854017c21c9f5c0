//! Core business logic for the session rotation protocol.
//!
//! The service is stateless per call; the only shared mutable resource is
//! the refresh token table behind the [`UserStore`], and the single-winner
//! guarantee for concurrent refreshes rests entirely on the store's atomic
//! rotation. No retries happen here: connectivity errors are surfaced as
//! [`AuthError::UpstreamUnavailable`] for the transport layer to handle,
//! and every protocol error is terminal for the call.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::models::SessionPair;
use crate::config::Config;
use crate::database::models::{NewUser, User};
use crate::errors::{AuthError, AuthResult};
use crate::repositories::user_store::{
    InsertUserOutcome, ResetOutcome, RotationOutcome, UserStore,
};
use crate::utils::jwt::TokenIssuer;
use crate::utils::password::{self, VerifyOutcome};
use crate::utils::random::{TOKEN_LENGTH, random_token};

/// Orchestrates register, login, refresh, logout, and password reset.
pub struct SessionService<S> {
    store: S,
    issuer: Arc<TokenIssuer>,
    refresh_ttl: Duration,
    bcrypt_cost: u32,
    default_role: String,
    registration_auto_active: bool,
    require_active_users: bool,
}

impl<S: UserStore> SessionService<S> {
    pub fn new(store: S, issuer: Arc<TokenIssuer>, config: &Config) -> Self {
        SessionService {
            store,
            issuer,
            refresh_ttl: Duration::minutes(config.refresh_token_ttl_minutes),
            bcrypt_cost: config.bcrypt_cost,
            default_role: config.default_role.clone(),
            registration_auto_active: config.registration_auto_active,
            require_active_users: config.require_active_users,
        }
    }

    /// Creates a user account. Does not issue tokens; login is a separate
    /// step by design.
    pub async fn register(&self, username: &str, password: &str) -> AuthResult<()> {
        let password_hash = password::hash_password(password, self.bcrypt_cost)?;

        let outcome = self
            .store
            .insert_user(NewUser {
                username: username.to_string(),
                password_hash,
                active: self.registration_auto_active,
                default_role: self.default_role.clone(),
                secret_token: random_token(TOKEN_LENGTH),
            })
            .await?;

        match outcome {
            InsertUserOutcome::Inserted => {
                info!(username, "user registered");
                Ok(())
            }
            InsertUserOutcome::DuplicateUsername => Err(AuthError::DuplicateUsername),
        }
    }

    /// Verifies credentials and issues a fresh session pair.
    ///
    /// An unknown username and a wrong password produce the same error so
    /// callers cannot probe for registered usernames.
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<SessionPair> {
        let user = self
            .store
            .lookup_user_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // The activation gate runs before password verification.
        if self.require_active_users && !user.active {
            return Err(AuthError::InactiveUser);
        }

        match password::verify_password(password, &user.password_hash) {
            VerifyOutcome::Match => {}
            VerifyOutcome::Mismatch => return Err(AuthError::InvalidCredentials),
            VerifyOutcome::MalformedHash => {
                warn!(user_id = user.id, "stored password hash is malformed");
                return Err(AuthError::InvalidCredentials);
            }
        }

        let refresh_token = random_token(TOKEN_LENGTH);
        let refresh_expires_at = Utc::now() + self.refresh_ttl;
        self.store
            .insert_refresh_token(user.id, &refresh_token, refresh_expires_at)
            .await?;

        info!(user_id = user.id, "user logged in");
        self.issue_pair(&user, refresh_token, refresh_expires_at)
    }

    /// Exchanges a valid refresh token for a new session pair, atomically
    /// consuming the old token.
    ///
    /// Under concurrent calls with the same token, exactly one wins; the
    /// losers get [`AuthError::InvalidRefreshToken`] and must fall back to
    /// a full login, never retry with the stale value.
    pub async fn refresh(&self, presented_token: &str) -> AuthResult<SessionPair> {
        let Some((row, user)) = self.store.lookup_refresh_token(presented_token).await? else {
            return Err(AuthError::InvalidRefreshToken);
        };

        if row.is_expired(Utc::now()) {
            return Err(AuthError::InvalidRefreshToken);
        }

        let new_token = random_token(TOKEN_LENGTH);
        let new_expires_at = Utc::now() + self.refresh_ttl;
        let outcome = self
            .store
            .rotate_refresh_token(presented_token, user.id, &new_token, new_expires_at)
            .await?;

        match outcome {
            RotationOutcome::Rotated => {
                info!(user_id = user.id, "refresh token rotated");
                self.issue_pair(&user, new_token, new_expires_at)
            }
            // Lost a rotation race; the token was consumed between lookup
            // and rotate.
            RotationOutcome::NotFound => Err(AuthError::InvalidRefreshToken),
        }
    }

    /// Revokes a refresh token. Idempotent: unknown tokens succeed, and
    /// only store connectivity failures surface.
    pub async fn logout(&self, refresh_token: &str) -> AuthResult<()> {
        self.store.delete_refresh_token(refresh_token).await?;
        Ok(())
    }

    /// Sets a new password for the user matching the one-time secret,
    /// rotating the secret in the same operation.
    pub async fn reset_password(&self, secret_token: &str, new_password: &str) -> AuthResult<()> {
        let password_hash = password::hash_password(new_password, self.bcrypt_cost)?;
        let new_secret = random_token(TOKEN_LENGTH);

        match self
            .store
            .reset_password(secret_token, &password_hash, &new_secret)
            .await?
        {
            ResetOutcome::Reset => Ok(()),
            ResetOutcome::NotFound => Err(AuthError::InvalidResetToken),
        }
    }

    fn issue_pair(
        &self,
        user: &User,
        refresh_token: String,
        refresh_token_expires_at: DateTime<Utc>,
    ) -> AuthResult<SessionPair> {
        let (access_token, access_token_expires_at) = self.issuer.issue(user)?;
        Ok(SessionPair {
            access_token,
            access_token_expires_at,
            refresh_token,
            refresh_token_expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory_store::MemoryStore;

    fn test_config() -> Config {
        Config {
            database_url: "sqlite::memory:".into(),
            max_connections: 1,
            acquire_timeout_seconds: 3,
            jwt_secret: "test-secret".into(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_minutes: 60,
            // Minimum bcrypt cost; keeps the tests fast.
            bcrypt_cost: 4,
            default_role: "user".into(),
            registration_auto_active: true,
            require_active_users: true,
            extra_claim_fields: vec![],
            server_port: 0,
        }
    }

    fn service_with(config: Config) -> (SessionService<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        let issuer = Arc::new(TokenIssuer::new(&config).unwrap());
        (SessionService::new(store.clone(), issuer, &config), store)
    }

    fn service() -> (SessionService<MemoryStore>, MemoryStore) {
        service_with(test_config())
    }

    #[tokio::test]
    async fn register_login_refresh_scenario() {
        let (service, _) = service();

        service.register("alice", "pw1").await.unwrap();

        let pair = service.login("alice", "pw1").await.unwrap();
        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());
        assert!(pair.access_token_expires_at > Utc::now());
        assert!(pair.refresh_token_expires_at > Utc::now());

        let rotated = service.refresh(&pair.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);

        // The consumed token is gone for good.
        assert!(matches!(
            service.refresh(&pair.refresh_token).await,
            Err(AuthError::InvalidRefreshToken)
        ));
    }

    #[tokio::test]
    async fn duplicate_registration_is_reported_as_such() {
        let (service, _) = service();
        service.register("alice", "pw1").await.unwrap();
        assert!(matches!(
            service.register("alice", "other").await,
            Err(AuthError::DuplicateUsername)
        ));
    }

    #[tokio::test]
    async fn unknown_username_and_wrong_password_are_indistinguishable() {
        let (service, _) = service();
        service.register("alice", "pw1").await.unwrap();

        let unknown = service.login("nobody", "pw1").await.unwrap_err();
        let mismatch = service.login("alice", "wrong").await.unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(mismatch, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), mismatch.to_string());
    }

    #[tokio::test]
    async fn inactive_gate_follows_configuration() {
        let mut config = test_config();
        config.registration_auto_active = false;

        let (strict, _) = service_with(config.clone());
        strict.register("alice", "pw1").await.unwrap();
        assert!(matches!(
            strict.login("alice", "pw1").await,
            Err(AuthError::InactiveUser)
        ));

        config.require_active_users = false;
        let (lenient, _) = service_with(config);
        lenient.register("bob", "pw2").await.unwrap();
        lenient.login("bob", "pw2").await.unwrap();
    }

    #[tokio::test]
    async fn malformed_stored_hash_behaves_like_a_mismatch() {
        let (service, store) = service();
        store
            .insert_user(NewUser {
                username: "corrupted".into(),
                password_hash: "not-a-bcrypt-hash".into(),
                active: true,
                default_role: "user".into(),
                secret_token: "s".into(),
            })
            .await
            .unwrap();

        assert!(matches!(
            service.login("corrupted", "anything").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn refresh_expiry_boundary_is_inclusive() {
        let (service, store) = service();
        service.register("alice", "pw1").await.unwrap();
        let user = store
            .lookup_user_by_username("alice")
            .await
            .unwrap()
            .unwrap();

        // expires_at exactly "now" is already expired.
        store
            .insert_refresh_token(user.id, "at-boundary", Utc::now())
            .await
            .unwrap();
        assert!(matches!(
            service.refresh("at-boundary").await,
            Err(AuthError::InvalidRefreshToken)
        ));

        // A token shortly before expiry is still valid.
        store
            .insert_refresh_token(user.id, "still-valid", Utc::now() + Duration::seconds(5))
            .await
            .unwrap();
        service.refresh("still-valid").await.unwrap();
    }

    #[tokio::test]
    async fn logout_is_idempotent_and_invalidates_the_token() {
        let (service, _) = service();
        service.register("alice", "pw1").await.unwrap();
        let pair = service.login("alice", "pw1").await.unwrap();

        service.logout(&pair.refresh_token).await.unwrap();
        service.logout(&pair.refresh_token).await.unwrap();

        assert!(matches!(
            service.refresh(&pair.refresh_token).await,
            Err(AuthError::InvalidRefreshToken)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_refresh_has_exactly_one_winner() {
        let (service, store) = service();
        service.register("alice", "pw1").await.unwrap();
        let pair = service.login("alice", "pw1").await.unwrap();
        let user = store
            .lookup_user_by_username("alice")
            .await
            .unwrap()
            .unwrap();

        let service = Arc::new(service);
        let a = {
            let service = Arc::clone(&service);
            let token = pair.refresh_token.clone();
            tokio::spawn(async move { service.refresh(&token).await })
        };
        let b = {
            let service = Arc::clone(&service);
            let token = pair.refresh_token.clone();
            tokio::spawn(async move { service.refresh(&token).await })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        for result in [&a, &b] {
            if let Err(e) = result {
                assert!(matches!(e, AuthError::InvalidRefreshToken));
            }
        }

        // Exactly one valid refresh token remains for the user.
        assert_eq!(store.refresh_token_count(user.id), 1);
    }

    #[tokio::test]
    async fn store_outage_surfaces_as_upstream_unavailable() {
        let (service, store) = service();
        service.register("alice", "pw1").await.unwrap();

        store.set_unavailable(true);
        assert!(matches!(
            service.login("alice", "pw1").await,
            Err(AuthError::UpstreamUnavailable { .. })
        ));
        assert!(matches!(
            service.logout("whatever").await,
            Err(AuthError::UpstreamUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn reset_password_consumes_the_secret() {
        let (service, store) = service();
        service.register("alice", "pw1").await.unwrap();
        let secret = store
            .lookup_user_by_username("alice")
            .await
            .unwrap()
            .unwrap()
            .secret_token;

        service.reset_password(&secret, "pw2").await.unwrap();

        // Old password no longer works, new one does.
        assert!(matches!(
            service.login("alice", "pw1").await,
            Err(AuthError::InvalidCredentials)
        ));
        service.login("alice", "pw2").await.unwrap();

        // The secret was rotated; reusing it fails.
        assert!(matches!(
            service.reset_password(&secret, "pw3").await,
            Err(AuthError::InvalidResetToken)
        ));
    }
}
