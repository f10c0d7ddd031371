//! Notification Repository Implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{Notification, NotificationRepository};
use crate::shared::error::AppError;

/// PostgreSQL implementation of notification persistence.
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, username, kind, from_user, room_id, message_id, body, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(notification.id)
        .bind(&notification.username)
        .bind(&notification.kind)
        .bind(&notification.from_user)
        .bind(notification.room_id)
        .bind(notification.message_id)
        .bind(&notification.body)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
