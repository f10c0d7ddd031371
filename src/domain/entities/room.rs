//! Room entity and repository trait.
//!
//! Maps to the `rooms` table in the database schema. Rooms are identified
//! by opaque snowflake ids at the core boundary; any legacy name-keyed
//! rooms are translated to ids at the repository boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Room types matching the database VARCHAR constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    #[default]
    Text,
    Voice,
    Announcements,
}

impl RoomType {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "voice" => Self::Voice,
            "announcements" => Self::Announcements,
            _ => Self::Text,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
            Self::Announcements => "announcements",
        }
    }
}

/// Represents a channel inside a server.
///
/// Maps to the `rooms` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - server_id: BIGINT NOT NULL
/// - name: VARCHAR(64) NOT NULL
/// - room_type: VARCHAR(16) NOT NULL DEFAULT 'text'
/// - position: INT NOT NULL DEFAULT 0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Owning server ID
    pub server_id: i64,

    /// Room name
    pub name: String,

    /// Room type
    #[serde(rename = "type")]
    pub room_type: RoomType,

    /// Sidebar ordering position
    pub position: i32,
}

/// Repository trait for room lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Find a room by its Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Room>, AppError>;

    /// List all rooms ordered by position (for sidebar rendering).
    async fn list(&self) -> Result<Vec<Room>, AppError>;

    /// The default room new connections land in: the first text room
    /// by position.
    async fn default_room(&self) -> Result<Room, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_type_conversion() {
        assert_eq!(RoomType::from_str("voice"), RoomType::Voice);
        assert_eq!(RoomType::from_str("announcements"), RoomType::Announcements);
        assert_eq!(RoomType::from_str("anything"), RoomType::Text);
        assert_eq!(RoomType::Voice.as_str(), "voice");
    }
}
