//! Session Repository Implementation
//!
//! Lookups for cookie-backed web sessions, keyed by the SHA-256 hash of
//! the cookie value. Expired rows are filtered in SQL rather than
//! deleted here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{SessionRepository, StoredSession};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    token_hash: String,
    username: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

/// PostgreSQL implementation of session lookups.
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn find_valid(&self, token_hash: &str) -> Result<Option<StoredSession>, AppError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT token_hash, username, expires_at, created_at
            FROM sessions
            WHERE token_hash = $1 AND expires_at > NOW()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| StoredSession {
            token_hash: r.token_hash,
            username: r.username,
            expires_at: r.expires_at,
            created_at: r.created_at,
        }))
    }
}
