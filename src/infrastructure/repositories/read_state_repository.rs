//! Read State Repository Implementation
//!
//! Monotonic upsert of per-(user, room) read positions. The conflict
//! clause only applies when the new id is strictly ahead, so regressions
//! from stale clients touch no rows.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::ReadStateRepository;
use crate::shared::error::AppError;

/// PostgreSQL implementation of read-position upserts.
pub struct PgReadStateRepository {
    pool: PgPool,
}

impl PgReadStateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadStateRepository for PgReadStateRepository {
    async fn advance(
        &self,
        username: &str,
        room_id: i64,
        message_id: i64,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO read_positions (username, room_id, last_read_message_id, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (username, room_id) DO UPDATE
            SET last_read_message_id = EXCLUDED.last_read_message_id,
                updated_at = NOW()
            WHERE read_positions.last_read_message_id < EXCLUDED.last_read_message_id
            "#,
        )
        .bind(username)
        .bind(room_id)
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
