//! Read position repository trait.
//!
//! Maps to the `read_positions` table: at most one row per
//! (username, room), monotonically non-decreasing.

use async_trait::async_trait;

use crate::shared::error::AppError;

/// Repository trait for read-position upserts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadStateRepository: Send + Sync {
    /// Upsert the read position for (username, room). Never regresses:
    /// returns true if the position advanced, false if the given message
    /// id is at or behind the stored one.
    async fn advance(
        &self,
        username: &str,
        room_id: i64,
        message_id: i64,
    ) -> Result<bool, AppError>;
}
