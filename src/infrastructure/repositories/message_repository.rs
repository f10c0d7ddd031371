//! Message Repository Implementation
//!
//! Message CRUD plus the edit-history log. Edits and deletions run inside
//! transactions: an edit appends the history row and mutates the live row
//! as one unit, and a delete removes reactions and history before the
//! message itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Message, MessageEdit, MessageRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    room_id: i64,
    author: String,
    color: String,
    content: String,
    file_url: Option<String>,
    file_type: Option<String>,
    mentions: Vec<String>,
    edited_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            room_id: self.room_id,
            author: self.author,
            color: self.color,
            content: self.content,
            file_url: self.file_url,
            file_type: self.file_type,
            mentions: self.mentions,
            edited_at: self.edited_at,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MessageEditRow {
    message_id: i64,
    original_content: String,
    edited_content: String,
    edited_by: String,
    edited_at: DateTime<Utc>,
}

const MESSAGE_COLUMNS: &str =
    "id, room_id, author, color, content, file_url, file_type, mentions, edited_at, created_at";

/// PostgreSQL implementation of message persistence.
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {} FROM messages WHERE id = $1",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_message()))
    }

    /// Most recent messages in a room, returned oldest first.
    async fn recent(&self, room_id: i64, limit: i32) -> Result<Vec<Message>, AppError> {
        let limit = limit.clamp(1, 200);

        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {}
            FROM messages
            WHERE room_id = $1
            ORDER BY id DESC
            LIMIT $2
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(room_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        // Queried newest-first for the index; replay wants oldest-first
        let mut messages: Vec<Message> = rows.into_iter().map(|r| r.into_message()).collect();
        messages.reverse();
        Ok(messages)
    }

    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            INSERT INTO messages (id, room_id, author, color, content, file_url, file_type, mentions, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(message.id)
        .bind(message.room_id)
        .bind(&message.author)
        .bind(&message.color)
        .bind(&message.content)
        .bind(&message.file_url)
        .bind(&message.file_type)
        .bind(&message.mentions)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_message())
    }

    async fn edit(
        &self,
        message_id: i64,
        new_content: &str,
        edited_by: &str,
    ) -> Result<Message, AppError> {
        let mut tx = self.pool.begin().await?;

        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO message_edits (message_id, original_content, edited_content, edited_by, edited_at)
            SELECT id, content, $2, $3, $4 FROM messages WHERE id = $1
            "#,
        )
        .bind(message_id)
        .bind(new_content)
        .bind(edited_by)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            UPDATE messages
            SET content = $2, edited_at = $3
            WHERE id = $1
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(message_id)
        .bind(new_content)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!(
                "Message {} not found",
                message_id
            )));
        };

        tx.commit().await?;
        Ok(row.into_message())
    }

    async fn delete(&self, message_id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM reactions WHERE message_id = $1")
            .bind(message_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM message_edits WHERE message_id = $1")
            .bind(message_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(message_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn edit_history(&self, message_id: i64) -> Result<Vec<MessageEdit>, AppError> {
        let rows = sqlx::query_as::<_, MessageEditRow>(
            r#"
            SELECT message_id, original_content, edited_content, edited_by, edited_at
            FROM message_edits
            WHERE message_id = $1
            ORDER BY edited_at
            "#,
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| MessageEdit {
                message_id: r.message_id,
                original_content: r.original_content,
                edited_content: r.edited_content,
                edited_by: r.edited_by,
                edited_at: r.edited_at,
            })
            .collect())
    }
}
