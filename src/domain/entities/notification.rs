//! Notification entity and repository trait.
//!
//! Maps to the `notifications` table. Mention notifications are created
//! best-effort by the message pipeline and never block the primary
//! message broadcast.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A targeted notification for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Recipient username
    pub username: String,

    /// Notification kind (currently "mention")
    pub kind: String,

    /// Username that triggered the notification
    pub from_user: String,

    /// Room the triggering message was sent to
    pub room_id: i64,

    /// The triggering message id
    pub message_id: i64,

    /// Excerpt of the triggering message
    pub body: String,

    /// Whether the user has seen the notification
    pub read: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Repository trait for notification persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Persist a new notification.
    async fn create(&self, notification: &Notification) -> Result<(), AppError>;
}
