//! Reaction Repository Implementation
//!
//! Reactions are stored per-user per-emoji per-message; the primary key
//! on (message_id, username, emoji) makes adds idempotent via
//! ON CONFLICT DO NOTHING.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{ReactionGroup, ReactionRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct ReactionGroupRow {
    emoji: String,
    count: i64,
    users: Vec<String>,
}

/// PostgreSQL implementation of reaction persistence.
pub struct PgReactionRepository {
    pool: PgPool,
}

impl PgReactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReactionRepository for PgReactionRepository {
    async fn add(&self, message_id: i64, username: &str, emoji: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO reactions (message_id, username, emoji)
            VALUES ($1, $2, $3)
            ON CONFLICT (message_id, username, emoji) DO NOTHING
            "#,
        )
        .bind(message_id)
        .bind(username)
        .bind(emoji)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, message_id: i64, username: &str, emoji: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            DELETE FROM reactions
            WHERE message_id = $1 AND username = $2 AND emoji = $3
            "#,
        )
        .bind(message_id)
        .bind(username)
        .bind(emoji)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All reactions on a message grouped by emoji, ordered by the emoji's
    /// first appearance on the message.
    async fn reactions_for(&self, message_id: i64) -> Result<Vec<ReactionGroup>, AppError> {
        let rows = sqlx::query_as::<_, ReactionGroupRow>(
            r#"
            SELECT emoji,
                   COUNT(*) AS count,
                   ARRAY_AGG(username ORDER BY created_at) AS users
            FROM reactions
            WHERE message_id = $1
            GROUP BY emoji
            ORDER BY MIN(created_at)
            "#,
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ReactionGroup {
                emoji: r.emoji,
                count: r.count,
                users: r.users,
            })
            .collect())
    }
}
