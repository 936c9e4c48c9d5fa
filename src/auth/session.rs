use axum::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::error::Error;

/// Length of the opaque session token handed to the client.
pub const TOKEN_LEN: usize = 48;

/// Server-side session record binding an opaque token to a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl Session {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

/// Generate an unguessable session token from the OS CSPRNG.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Durable repository mapping session tokens to users. Expired sessions
/// never resolve; implementations reap them lazily on lookup.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a new session for the user, valid for `ttl` from now.
    async fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<Session, Error>;
    /// Look up a token. Returns None for unknown or expired tokens.
    async fn resolve(&self, token: &str) -> Result<Option<Session>, Error>;
    /// Destroy a session if present. Idempotent.
    async fn destroy(&self, token: &str) -> Result<(), Error>;
    /// Destroy every session belonging to the user.
    async fn destroy_all_for_user(&self, user_id: Uuid) -> Result<(), Error>;
}

#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<Session, Error> {
        let token = generate_token();
        let expires_at = OffsetDateTime::now_utc() + ttl;
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (token, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING token, user_id, expires_at, created_at
            "#,
        )
        .bind(&token)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.db)
        .await
        .map_err(|e| Error::Store(anyhow::Error::new(e).context("insert session")))?;
        debug!(user_id = %user_id, "session issued");
        Ok(session)
    }

    async fn resolve(&self, token: &str) -> Result<Option<Session>, Error> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT token, user_id, expires_at, created_at
            FROM sessions
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| Error::Store(anyhow::Error::new(e).context("resolve session")))?;

        match session {
            Some(s) if s.is_expired(OffsetDateTime::now_utc()) => {
                // Lazy reaping: an expired row must behave as if it never existed.
                self.destroy(token).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn destroy(&self, token: &str) -> Result<(), Error> {
        sqlx::query(r#"DELETE FROM sessions WHERE token = $1"#)
            .bind(token)
            .execute(&self.db)
            .await
            .map_err(|e| Error::Store(anyhow::Error::new(e).context("destroy session")))?;
        Ok(())
    }

    async fn destroy_all_for_user(&self, user_id: Uuid) -> Result<(), Error> {
        sqlx::query(r#"DELETE FROM sessions WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| Error::Store(anyhow::Error::new(e).context("destroy user sessions")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_long_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn expiry_is_inclusive_of_the_deadline() {
        let now = OffsetDateTime::now_utc();
        let session = Session {
            token: generate_token(),
            user_id: Uuid::new_v4(),
            expires_at: now,
            created_at: now - Duration::days(7),
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - Duration::seconds(1)));
    }
}
