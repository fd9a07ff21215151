//! Credential store trait and its PostgreSQL implementation.
//!
//! The session core only talks to [`CredentialStore`]; any relational or
//! embedded backend can implement it. Two implementations ship with the
//! crate: [`PgCredentialStore`] here and
//! [`MemoryCredentialStore`](super::memory::MemoryCredentialStore) for tests
//! and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::auth::{AuthError, AuthResult, FailedLogin, RefreshToken, User, UserId};

/// Persistence operations needed by the authentication core
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create a new user
    ///
    /// # Errors
    ///
    /// * `AuthError::EmailTaken` - Email already exists
    async fn create_user(&self, email: &str, password_hash: &str) -> AuthResult<User>;

    /// Find user by exact email
    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Find user by ID
    async fn find_user_by_id(&self, user_id: UserId) -> AuthResult<Option<User>>;

    /// Count one failed login and arm a lockout when `threshold` is reached.
    ///
    /// Must be a single atomic step per user: increment the counter, and if
    /// the new value is at least `threshold`, reset it to 0 and set
    /// `lockout_until`. Returns the values written.
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - User no longer exists
    async fn record_failed_login(
        &self,
        user_id: UserId,
        threshold: i32,
        lockout_until: DateTime<Utc>,
    ) -> AuthResult<FailedLogin>;

    /// Reset the failure counter and clear any lockout
    async fn reset_failed_logins(&self, user_id: UserId) -> AuthResult<()>;

    /// Replace the stored password hash
    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> AuthResult<()>;

    /// Persist an issued refresh token
    async fn create_refresh_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<RefreshToken>;

    /// Find refresh token by exact string
    async fn find_refresh_token(&self, token: &str) -> AuthResult<Option<RefreshToken>>;

    /// Delete a refresh token.
    ///
    /// Returns `true` only for the caller that actually removed the row, which
    /// makes this the serialization point for concurrent rotations.
    async fn delete_refresh_token(&self, token: &str) -> AuthResult<bool>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> AuthResult<()>;
}

/// Default PostgreSQL implementation of `CredentialStore`
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, created_at, failed_login_attempts, lockout_until";

const REFRESH_TOKEN_COLUMNS: &str = "id, user_id, token, created_at, expires_at";

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        failed_login_attempts: row.try_get("failed_login_attempts")?,
        lockout_until: row.try_get("lockout_until")?,
    })
}

fn refresh_token_from_row(row: &PgRow) -> Result<RefreshToken, sqlx::Error> {
    Ok(RefreshToken {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        token: row.try_get("token")?,
        created_at: row.try_get("created_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> AuthResult<User> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::EmailTaken
            } else {
                AuthError::Database(e)
            }
        })?;

        Ok(user_from_row(&row)?)
    }

    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_user_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn record_failed_login(
        &self,
        user_id: UserId,
        threshold: i32,
        lockout_until: DateTime<Utc>,
    ) -> AuthResult<FailedLogin> {
        // SET expressions see the pre-update row, so both CASEs test the same value.
        let row = sqlx::query(
            r#"
            UPDATE users
            SET failed_login_attempts = CASE
                    WHEN failed_login_attempts + 1 >= $2 THEN 0
                    ELSE failed_login_attempts + 1
                END,
                lockout_until = CASE
                    WHEN failed_login_attempts + 1 >= $2 THEN $3
                    ELSE lockout_until
                END
            WHERE id = $1
            RETURNING failed_login_attempts, lockout_until
            "#,
        )
        .bind(user_id)
        .bind(threshold)
        .bind(lockout_until)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AuthError::UserNotFound)?;

        Ok(FailedLogin {
            failed_login_attempts: row.try_get("failed_login_attempts")?,
            lockout_until: row.try_get("lockout_until")?,
        })
    }

    async fn reset_failed_logins(&self, user_id: UserId) -> AuthResult<()> {
        sqlx::query(
            "UPDATE users SET failed_login_attempts = 0, lockout_until = NULL WHERE id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> AuthResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_refresh_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<RefreshToken> {
        let row = sqlx::query(&format!(
            "INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES ($1, $2, $3) \
             RETURNING {REFRESH_TOKEN_COLUMNS}"
        ))
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(refresh_token_from_row(&row)?)
    }

    async fn find_refresh_token(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        let row = sqlx::query(&format!(
            "SELECT {REFRESH_TOKEN_COLUMNS} FROM refresh_tokens WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(refresh_token_from_row).transpose()?)
    }

    async fn delete_refresh_token(&self, token: &str) -> AuthResult<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> AuthResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
