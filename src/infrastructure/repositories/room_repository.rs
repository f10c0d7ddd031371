//! Room Repository Implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{Room, RoomRepository, RoomType};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct RoomRow {
    id: i64,
    server_id: i64,
    name: String,
    room_type: String,
    position: i32,
}

impl RoomRow {
    fn into_room(self) -> Room {
        Room {
            id: self.id,
            server_id: self.server_id,
            name: self.name,
            room_type: RoomType::from_str(&self.room_type),
            position: self.position,
        }
    }
}

/// PostgreSQL implementation of room lookups.
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Room>, AppError> {
        let row = sqlx::query_as::<_, RoomRow>(
            r#"
            SELECT id, server_id, name, room_type, position
            FROM rooms
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_room()))
    }

    async fn list(&self) -> Result<Vec<Room>, AppError> {
        let rows = sqlx::query_as::<_, RoomRow>(
            r#"
            SELECT id, server_id, name, room_type, position
            FROM rooms
            ORDER BY position, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_room()).collect())
    }

    async fn default_room(&self) -> Result<Room, AppError> {
        let row = sqlx::query_as::<_, RoomRow>(
            r#"
            SELECT id, server_id, name, room_type, position
            FROM rooms
            ORDER BY position, id
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_room())
            .ok_or_else(|| AppError::Internal("No rooms configured".into()))
    }
}
