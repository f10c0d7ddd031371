//! Reaction entity and repository trait.
//!
//! Maps to the `reactions` table. Reactions have set semantics per
//! (message, user, emoji) triple; the store enforces uniqueness.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Individual reaction record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub message_id: i64,
    pub username: String,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregated reaction data for display.
///
/// Clients receive the full grouped list after every mutation rather than
/// deltas, so they stay trivially consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionGroup {
    /// The emoji identifier (Unicode or custom emoji name)
    pub emoji: String,

    /// Total count of users who reacted with this emoji
    pub count: i64,

    /// Usernames who reacted, in the order they reacted
    pub users: Vec<String>,
}

/// Repository trait for reaction operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReactionRepository: Send + Sync {
    /// Add a reaction. Idempotent: adding the same (message, user, emoji)
    /// twice has no effect.
    async fn add(&self, message_id: i64, username: &str, emoji: &str) -> Result<(), AppError>;

    /// Remove a reaction. Removing a non-existent reaction is a no-op.
    async fn remove(&self, message_id: i64, username: &str, emoji: &str) -> Result<(), AppError>;

    /// All reactions on a message, grouped by emoji, ordered by when each
    /// emoji was first used.
    async fn reactions_for(&self, message_id: i64) -> Result<Vec<ReactionGroup>, AppError>;
}
