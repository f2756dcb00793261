// src/repositories/postgres/chat.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use voltledger_common::models::{ChatMessage, ChatSession};
use voltledger_common::traits::ChatRepository;
use crate::Error;

pub struct PostgresChatRepository {
    pool: Pool<Postgres>,
}

impl PostgresChatRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_session(r: &PgRow) -> Result<ChatSession, Error> {
    Ok(ChatSession {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        language: r.try_get::<String, _>("language")?.parse()?,
        is_active: r.try_get("is_active")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn row_to_message(r: &PgRow) -> Result<ChatMessage, Error> {
    Ok(ChatMessage {
        id: r.try_get("id")?,
        session_id: r.try_get("session_id")?,
        role: r.try_get::<String, _>("role")?.parse()?,
        content: r.try_get("content")?,
        created_at: r.try_get("created_at")?,
    })
}

#[async_trait]
impl ChatRepository for PostgresChatRepository {
    async fn create_session(&self, s: &ChatSession) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO chat_sessions (id, user_id, language, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
            .bind(s.id)
            .bind(s.user_id)
            .bind(s.language.to_string())
            .bind(s.is_active)
            .bind(s.created_at)
            .bind(s.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<ChatSession>, Error> {
        let row = sqlx::query("SELECT * FROM chat_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_session).transpose()
    }

    async fn find_active_session(&self, user_id: Uuid) -> Result<Option<ChatSession>, Error> {
        let row = sqlx::query(
            r#"
            SELECT * FROM chat_sessions
            WHERE user_id = $1 AND is_active = TRUE
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_session).transpose()
    }

    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<ChatSession>, Error> {
        let rows = sqlx::query("SELECT * FROM chat_sessions WHERE user_id = $1 ORDER BY updated_at DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_session).collect()
    }

    async fn end_session(&self, user_id: Uuid, id: Uuid) -> Result<bool, Error> {
        let result = sqlx::query(
            "UPDATE chat_sessions SET is_active = FALSE, updated_at = $1 WHERE id = $2 AND user_id = $3",
        )
            .bind(Utc::now())
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_message(&self, m: &ChatMessage) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, session_id, role, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
            .bind(m.id)
            .bind(m.session_id)
            .bind(m.role.to_string())
            .bind(&m.content)
            .bind(m.created_at)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE chat_sessions SET updated_at = $1 WHERE id = $2")
            .bind(m.created_at)
            .bind(m.session_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn recent_messages(&self, session_id: Uuid, limit: i64) -> Result<Vec<ChatMessage>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM (
                SELECT * FROM chat_messages
                WHERE session_id = $1
                ORDER BY created_at DESC
                LIMIT $2
            ) recent
            ORDER BY created_at ASC
            "#,
        )
            .bind(session_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_message).collect()
    }
}
