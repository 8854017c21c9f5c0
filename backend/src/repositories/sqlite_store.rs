//! SQLite implementation of the user/token store.
//!
//! Rotation runs inside a transaction owned by this adapter: the old row is
//! deleted keyed by `(token, user_id)` and a zero-row delete rolls back and
//! reports `NotFound`, which is how concurrent rotations of the same token
//! resolve to a single winner. Duplicate usernames come back as a typed
//! outcome from the uniqueness constraint, never from parsing error text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use sqlx::types::Json;

use crate::database::models::{NewUser, RefreshTokenRow, User};
use crate::errors::StoreError;
use crate::repositories::user_store::{
    InsertUserOutcome, ResetOutcome, RotationOutcome, UserStore,
};

/// Store adapter over a SQLite connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    active: bool,
    default_role: String,
    roles: Json<Vec<String>>,
    extra: Json<Map<String, Value>>,
    secret_token: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            active: row.active,
            default_role: row.default_role,
            roles: row.roles.0,
            extra: row.extra.0,
            secret_token: row.secret_token,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TokenWithUserRow {
    token: String,
    user_id: i64,
    expires_at: DateTime<Utc>,
    token_created_at: DateTime<Utc>,
    #[sqlx(flatten)]
    user: UserRow,
}

fn db_err(error: sqlx::Error) -> StoreError {
    StoreError::Unavailable {
        source: anyhow::Error::new(error),
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn lookup_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, active, default_role, roles, extra, \
             secret_token, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(User::from))
    }

    async fn insert_user(&self, user: NewUser) -> Result<InsertUserOutcome, StoreError> {
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, active, default_role, roles, extra, \
             secret_token, created_at) VALUES (?, ?, ?, ?, '[]', '{}', ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.active)
        .bind(&user.default_role)
        .bind(&user.secret_token)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertUserOutcome::Inserted),
            Err(e)
                if e.as_database_error()
                    .is_some_and(|db| db.is_unique_violation()) =>
            {
                Ok(InsertUserOutcome::DuplicateUsername)
            }
            Err(e) => Err(db_err(e)),
        }
    }

    async fn lookup_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<(RefreshTokenRow, User)>, StoreError> {
        let row = sqlx::query_as::<_, TokenWithUserRow>(
            "SELECT rt.token, rt.user_id, rt.expires_at, rt.created_at AS token_created_at, \
             u.id, u.username, u.password_hash, u.active, u.default_role, u.roles, u.extra, \
             u.secret_token, u.created_at \
             FROM refresh_tokens rt JOIN users u ON u.id = rt.user_id WHERE rt.token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(|row| {
            (
                RefreshTokenRow {
                    token: row.token,
                    user_id: row.user_id,
                    expires_at: row.expires_at,
                    created_at: row.token_created_at,
                },
                User::from(row.user),
            )
        }))
    }

    async fn insert_refresh_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        old_token: &str,
        user_id: i64,
        new_token: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<RotationOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE token = ? AND user_id = ?")
            .bind(old_token)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await.map_err(db_err)?;
            return Ok(RotationOutcome::NotFound);
        }

        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(new_token)
        .bind(user_id)
        .bind(new_expires_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(RotationOutcome::Rotated)
    }

    async fn delete_refresh_token(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn reset_password(
        &self,
        secret_token: &str,
        new_password_hash: &str,
        new_secret_token: &str,
    ) -> Result<ResetOutcome, StoreError> {
        let updated = sqlx::query(
            "UPDATE users SET password_hash = ?, secret_token = ? WHERE secret_token = ?",
        )
        .bind(new_password_hash)
        .bind(new_secret_token)
        .bind(secret_token)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if updated.rows_affected() == 0 {
            Ok(ResetOutcome::NotFound)
        } else {
            Ok(ResetOutcome::Reset)
        }
    }
}
