//! Private message entity and repository trait.
//!
//! Maps to the `private_messages` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A direct message between two users.
///
/// Delivered to every connection of the recipient username, not to a
/// single connection id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateMessage {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Sender username
    pub from_user: String,

    /// Recipient username
    pub to_user: String,

    /// Sanitized message content
    pub content: String,

    /// Timestamp when the message was sent
    pub created_at: DateTime<Utc>,
}

/// Repository trait for private message persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrivateMessageRepository: Send + Sync {
    /// Persist a new private message.
    async fn create(&self, message: &PrivateMessage) -> Result<PrivateMessage, AppError>;
}
