//! In-memory implementation of the user/token store.
//!
//! Backs the protocol tests and local demos. One mutex guards all state,
//! which trivially gives rotation the same atomicity the SQLite store gets
//! from a transaction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::models::{NewUser, RefreshTokenRow, User};
use crate::errors::StoreError;
use crate::repositories::user_store::{
    InsertUserOutcome, ResetOutcome, RotationOutcome, UserStore,
};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    tokens: HashMap<String, RefreshTokenRow>,
    next_user_id: i64,
    /// When set, every operation fails as if the store were unreachable.
    unavailable: bool,
}

/// Shared-handle in-memory store; clones see the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates store connectivity loss for tests of the
    /// `UpstreamUnavailable` path.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unwrap().unavailable = unavailable;
    }

    /// Number of refresh token rows currently held for a user.
    pub fn refresh_token_count(&self, user_id: i64) -> usize {
        self.inner
            .lock()
            .unwrap()
            .tokens
            .values()
            .filter(|row| row.user_id == user_id)
            .count()
    }

    fn check_available(inner: &Inner) -> Result<(), StoreError> {
        if inner.unavailable {
            return Err(StoreError::Unavailable {
                source: anyhow::anyhow!("memory store marked unavailable"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn lookup_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        Ok(inner
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<InsertUserOutcome, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;

        if inner.users.iter().any(|u| u.username == user.username) {
            return Ok(InsertUserOutcome::DuplicateUsername);
        }

        inner.next_user_id += 1;
        let id = inner.next_user_id;
        inner.users.push(User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            active: user.active,
            default_role: user.default_role,
            roles: Vec::new(),
            extra: serde_json::Map::new(),
            secret_token: user.secret_token,
            created_at: Utc::now(),
        });
        Ok(InsertUserOutcome::Inserted)
    }

    async fn lookup_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<(RefreshTokenRow, User)>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;

        let Some(row) = inner.tokens.get(token).cloned() else {
            return Ok(None);
        };
        let user = inner
            .users
            .iter()
            .find(|user| user.id == row.user_id)
            .cloned();
        Ok(user.map(|user| (row, user)))
    }

    async fn insert_refresh_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;

        inner.tokens.insert(
            token.to_string(),
            RefreshTokenRow {
                token: token.to_string(),
                user_id,
                expires_at,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        old_token: &str,
        user_id: i64,
        new_token: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<RotationOutcome, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;

        // Delete-then-insert under one lock: either both happen or neither.
        let matches = inner
            .tokens
            .get(old_token)
            .is_some_and(|row| row.user_id == user_id);
        if !matches {
            return Ok(RotationOutcome::NotFound);
        }
        inner.tokens.remove(old_token);
        inner.tokens.insert(
            new_token.to_string(),
            RefreshTokenRow {
                token: new_token.to_string(),
                user_id,
                expires_at: new_expires_at,
                created_at: Utc::now(),
            },
        );
        Ok(RotationOutcome::Rotated)
    }

    async fn delete_refresh_token(&self, token: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        inner.tokens.remove(token);
        Ok(())
    }

    async fn reset_password(
        &self,
        secret_token: &str,
        new_password_hash: &str,
        new_secret_token: &str,
    ) -> Result<ResetOutcome, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;

        match inner
            .users
            .iter_mut()
            .find(|user| user.secret_token == secret_token)
        {
            Some(user) => {
                user.password_hash = new_password_hash.to_string();
                user.secret_token = new_secret_token.to_string();
                Ok(ResetOutcome::Reset)
            }
            None => Ok(ResetOutcome::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.into(),
            password_hash: "hash".into(),
            active: true,
            default_role: "user".into(),
            secret_token: format!("secret-{username}"),
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_a_typed_outcome() {
        let store = MemoryStore::new();
        assert_eq!(
            store.insert_user(new_user("alice")).await.unwrap(),
            InsertUserOutcome::Inserted
        );
        assert_eq!(
            store.insert_user(new_user("alice")).await.unwrap(),
            InsertUserOutcome::DuplicateUsername
        );
    }

    #[tokio::test]
    async fn rotate_consumes_the_old_token_exactly_once() {
        let store = MemoryStore::new();
        store.insert_user(new_user("alice")).await.unwrap();
        let user = store
            .lookup_user_by_username("alice")
            .await
            .unwrap()
            .unwrap();

        let expires = Utc::now() + Duration::minutes(10);
        store
            .insert_refresh_token(user.id, "old", expires)
            .await
            .unwrap();

        let first = store
            .rotate_refresh_token("old", user.id, "new-a", expires)
            .await
            .unwrap();
        let second = store
            .rotate_refresh_token("old", user.id, "new-b", expires)
            .await
            .unwrap();

        assert_eq!(first, RotationOutcome::Rotated);
        assert_eq!(second, RotationOutcome::NotFound);
        assert_eq!(store.refresh_token_count(user.id), 1);
        assert!(
            store
                .lookup_refresh_token("new-a")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn rotate_checks_the_user_binding() {
        let store = MemoryStore::new();
        store.insert_user(new_user("alice")).await.unwrap();
        let user = store
            .lookup_user_by_username("alice")
            .await
            .unwrap()
            .unwrap();

        let expires = Utc::now() + Duration::minutes(10);
        store
            .insert_refresh_token(user.id, "tok", expires)
            .await
            .unwrap();

        let outcome = store
            .rotate_refresh_token("tok", user.id + 1, "new", expires)
            .await
            .unwrap();
        assert_eq!(outcome, RotationOutcome::NotFound);
        // The mismatched call must not have consumed the row.
        assert!(store.lookup_refresh_token("tok").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.delete_refresh_token("never-existed").await.unwrap();
        store.delete_refresh_token("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn reset_password_rotates_the_secret() {
        let store = MemoryStore::new();
        store.insert_user(new_user("alice")).await.unwrap();

        let outcome = store
            .reset_password("secret-alice", "new-hash", "fresh-secret")
            .await
            .unwrap();
        assert_eq!(outcome, ResetOutcome::Reset);

        // The old secret is single-use.
        let outcome = store
            .reset_password("secret-alice", "another-hash", "another-secret")
            .await
            .unwrap();
        assert_eq!(outcome, ResetOutcome::NotFound);

        let user = store
            .lookup_user_by_username("alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.password_hash, "new-hash");
        assert_eq!(user.secret_token, "fresh-secret");
    }

    #[tokio::test]
    async fn unavailable_store_reports_store_error() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(store.lookup_user_by_username("alice").await.is_err());
    }
}
