use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use super::{Notification, NotificationError, NotificationStore};

/// Notification store over the `notifications` table.
#[derive(Debug, Clone)]
pub struct PostgresNotificationStore {
    pool: PgPool,
}

impl PostgresNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    #[instrument(
        skip(self, notification),
        fields(user_id = %notification.user_id, kind = notification.kind.as_str()),
        err
    )]
    async fn emit(&self, notification: &Notification) -> Result<bool, NotificationError> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (
                id, user_id, kind, title, message, payload, source_event_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (source_event_id, user_id) DO NOTHING
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.user_id.as_uuid())
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.payload)
        .bind(notification.source_event_id)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| NotificationError::Store(format!("emit: {e}")))?;

        Ok(result.rows_affected() == 1)
    }
}
