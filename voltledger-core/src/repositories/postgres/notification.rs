// src/repositories/postgres/notification.rs

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use voltledger_common::models::Notification;
use voltledger_common::traits::NotificationRepository;
use crate::Error;

pub struct PostgresNotificationRepository {
    pool: Pool<Postgres>,
}

impl PostgresNotificationRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_notification(r: &PgRow) -> Result<Notification, Error> {
    Ok(Notification {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        kind: r.try_get::<String, _>("kind")?.parse()?,
        title: r.try_get("title")?,
        body: r.try_get("body")?,
        data: r.try_get("data")?,
        is_read: r.try_get("is_read")?,
        created_at: r.try_get("created_at")?,
    })
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    async fn insert(&self, n: &Notification) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, body, data, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
            .bind(n.id)
            .bind(n.user_id)
            .bind(n.kind.to_string())
            .bind(&n.title)
            .bind(&n.body)
            .bind(&n.data)
            .bind(n.is_read)
            .bind(n.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid, unread_only: bool, limit: i64) -> Result<Vec<Notification>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1
              AND ($2 = FALSE OR is_read = FALSE)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
            .bind(user_id)
            .bind(unread_only)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_notification).collect()
    }

    async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<bool, Error> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
