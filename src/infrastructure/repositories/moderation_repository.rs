//! Moderation Repository Implementation
//!
//! Active-record lookups for mutes, bans, and blocks. "Active" means the
//! most recent row for the username whose expiry is NULL (permanent) or in
//! the future.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Ban, ModerationRepository, Mute};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct ModerationRow {
    username: String,
    issued_by: String,
    reason: String,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// PostgreSQL implementation of moderation-state lookups.
pub struct PgModerationRepository {
    pool: PgPool,
}

impl PgModerationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn active_row(&self, table: &str, username: &str) -> Result<Option<ModerationRow>, AppError> {
        // table is a compile-time constant from the two call sites below
        let row = sqlx::query_as::<_, ModerationRow>(&format!(
            r#"
            SELECT username, issued_by, reason, expires_at, created_at
            FROM {}
            WHERE username = $1
              AND (expires_at IS NULL OR expires_at > NOW())
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            table
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl ModerationRepository for PgModerationRepository {
    async fn active_ban(&self, username: &str) -> Result<Option<Ban>, AppError> {
        Ok(self.active_row("bans", username).await?.map(|r| Ban {
            username: r.username,
            issued_by: r.issued_by,
            reason: r.reason,
            expires_at: r.expires_at,
            created_at: r.created_at,
        }))
    }

    async fn active_mute(&self, username: &str) -> Result<Option<Mute>, AppError> {
        Ok(self.active_row("mutes", username).await?.map(|r| Mute {
            username: r.username,
            issued_by: r.issued_by,
            reason: r.reason,
            expires_at: r.expires_at,
            created_at: r.created_at,
        }))
    }

    async fn is_blocked(&self, blocker: &str, blocked: &str) -> Result<bool, AppError> {
        let exists: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT 1 FROM blocks
            WHERE blocker = $1 AND blocked = $2
            "#,
        )
        .bind(blocker)
        .bind(blocked)
        .fetch_optional(&self.pool)
        .await?;

        Ok(exists.is_some())
    }
}
