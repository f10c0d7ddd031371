//! Moderation entities (mute, ban, block) and repository trait.
//!
//! Maps to the `mutes`, `bans`, and `blocks` tables. At most one effective
//! active mute and one active ban exist per username at evaluation time:
//! the repository returns the most recent non-expired row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A time-boxed restriction preventing a user from sending messages
/// while still connected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mute {
    /// Muted username
    pub username: String,

    /// Username that issued the mute
    pub issued_by: String,

    /// Human-readable reason shown to the muted user
    pub reason: String,

    /// Expiry timestamp; None means permanent
    pub expires_at: Option<DateTime<Utc>>,

    /// When the mute was issued
    pub created_at: DateTime<Utc>,
}

/// A restriction preventing a user from connecting at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ban {
    /// Banned username
    pub username: String,

    /// Username that issued the ban
    pub issued_by: String,

    /// Human-readable reason included in the rejection payload
    pub reason: String,

    /// Expiry timestamp; None means permanent
    pub expires_at: Option<DateTime<Utc>>,

    /// When the ban was issued
    pub created_at: DateTime<Utc>,
}

/// Repository trait for moderation lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModerationRepository: Send + Sync {
    /// The most recent non-expired active ban for a username, if any.
    async fn active_ban(&self, username: &str) -> Result<Option<Ban>, AppError>;

    /// The most recent non-expired active mute for a username, if any.
    async fn active_mute(&self, username: &str) -> Result<Option<Mute>, AppError>;

    /// Whether `blocker` has blocked `blocked`. Directional: check both
    /// orders to gate a private message bidirectionally.
    async fn is_blocked(&self, blocker: &str, blocked: &str) -> Result<bool, AppError>;
}
