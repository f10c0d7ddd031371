//! Private Message Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{PrivateMessage, PrivateMessageRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct PrivateMessageRow {
    id: i64,
    from_user: String,
    to_user: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl PrivateMessageRow {
    fn into_message(self) -> PrivateMessage {
        PrivateMessage {
            id: self.id,
            from_user: self.from_user,
            to_user: self.to_user,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL implementation of private message persistence.
pub struct PgPrivateMessageRepository {
    pool: PgPool,
}

impl PgPrivateMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrivateMessageRepository for PgPrivateMessageRepository {
    async fn create(&self, message: &PrivateMessage) -> Result<PrivateMessage, AppError> {
        let row = sqlx::query_as::<_, PrivateMessageRow>(
            r#"
            INSERT INTO private_messages (id, from_user, to_user, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, from_user, to_user, content, created_at
            "#,
        )
        .bind(message.id)
        .bind(&message.from_user)
        .bind(&message.to_user)
        .bind(&message.content)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_message())
    }
}
