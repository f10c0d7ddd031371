//! Message entity, edit history, and repository trait.
//!
//! Maps to the `messages` and `message_edits` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Represents a chat message in a room.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - room_id: BIGINT NOT NULL REFERENCES rooms(id)
/// - author: VARCHAR(32) NOT NULL REFERENCES users(username)
/// - color: VARCHAR(16) NOT NULL
/// - content: TEXT NOT NULL (max 2000 characters)
/// - file_url: TEXT NULL
/// - file_type: VARCHAR(32) NULL
/// - mentions: TEXT[] NOT NULL DEFAULT '{}'
/// - edited_at: TIMESTAMPTZ NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
///
/// Immutable once broadcast, except for edit/delete which append audit
/// trail rows and tombstone the live row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Room the message was sent to
    pub room_id: i64,

    /// Author username
    pub author: String,

    /// Author color tag at send time
    pub color: String,

    /// Sanitized message content
    pub content: String,

    /// Attached file URL, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,

    /// Attached file type tag, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    /// Distinct usernames mentioned in the content
    pub mentions: Vec<String>,

    /// Timestamp of the last edit (None if never edited)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,

    /// Timestamp when the message was sent
    pub created_at: DateTime<Utc>,
}

/// An immutable edit-history entry.
///
/// Maps to the `message_edits` table. Append-only: after N edits a message
/// has exactly N entries and the live content equals the last entry's
/// `edited_content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEdit {
    /// Message this entry belongs to
    pub message_id: i64,

    /// Content before the edit
    pub original_content: String,

    /// Content after the edit
    pub edited_content: String,

    /// Username that performed the edit (author or admin)
    pub edited_by: String,

    /// When the edit was applied
    pub edited_at: DateTime<Utc>,
}

/// Repository trait for message data access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find a message by its Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError>;

    /// The most recent `limit` messages in a room, in chronological order
    /// (oldest first) for history replay.
    async fn recent(&self, room_id: i64, limit: i32) -> Result<Vec<Message>, AppError>;

    /// Persist a new message.
    async fn create(&self, message: &Message) -> Result<Message, AppError>;

    /// Apply an edit: append the edit-history row and mutate the live row
    /// in one atomic unit. If the history insert fails, the edit must not
    /// apply.
    async fn edit(
        &self,
        message_id: i64,
        new_content: &str,
        edited_by: &str,
    ) -> Result<Message, AppError>;

    /// Delete a message, cascading its reactions and edit history first.
    async fn delete(&self, message_id: i64) -> Result<(), AppError>;

    /// Edit history for a message, oldest first.
    async fn edit_history(&self, message_id: i64) -> Result<Vec<MessageEdit>, AppError>;
}
