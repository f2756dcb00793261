// src/repositories/postgres/usage.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use voltledger_common::models::{PageRequest, UsageBreakdown, UsageLimit, UsageLog};
use voltledger_common::traits::{UsageLimitRepository, UsageRepository};
use crate::Error;

pub struct PostgresUsageRepository {
    pool: Pool<Postgres>,
}

impl PostgresUsageRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_log(r: &PgRow) -> Result<UsageLog, Error> {
    Ok(UsageLog {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        token_id: r.try_get("token_id")?,
        amount: r.try_get("amount")?,
        timestamp: r.try_get("timestamp")?,
        metadata: r.try_get("metadata")?,
    })
}

#[async_trait]
impl UsageRepository for PostgresUsageRepository {
    async fn insert(&self, log: &UsageLog) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO usage_logs (id, user_id, token_id, amount, timestamp, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
            .bind(log.id)
            .bind(log.user_id)
            .bind(log.token_id)
            .bind(log.amount)
            .bind(log.timestamp)
            .bind(&log.metadata)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn breakdown_since(&self, user_id: Uuid, since: Option<DateTime<Utc>>) -> Result<UsageBreakdown, Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(u.amount), 0) AS total,
                COALESCE(SUM(u.amount) FILTER (WHERE t.token_type = 'RENEWABLE'), 0) AS renewable,
                COALESCE(SUM(u.amount) FILTER (WHERE t.token_type <> 'RENEWABLE'), 0) AS non_renewable
            FROM usage_logs u
            JOIN tokens t ON t.id = u.token_id
            WHERE u.user_id = $1
              AND ($2::timestamptz IS NULL OR u.timestamp >= $2)
            "#,
        )
            .bind(user_id)
            .bind(since)
            .fetch_one(&self.pool)
            .await?;

        Ok(UsageBreakdown {
            total: row.try_get::<Decimal, _>("total")?,
            renewable: row.try_get::<Decimal, _>("renewable")?,
            non_renewable: row.try_get::<Decimal, _>("non_renewable")?,
        })
    }

    async fn list_for_user(&self, user_id: Uuid, since: Option<DateTime<Utc>>) -> Result<Vec<UsageLog>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, token_id, amount, timestamp, metadata
            FROM usage_logs
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR timestamp >= $2)
            ORDER BY timestamp DESC
            "#,
        )
            .bind(user_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_log).collect()
    }

    async fn list_all(&self, page: PageRequest) -> Result<(Vec<UsageLog>, i64), Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, token_id, amount, timestamp, metadata
            FROM usage_logs
            ORDER BY timestamp DESC
            LIMIT $1 OFFSET $2
            "#,
        )
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usage_logs")
            .fetch_one(&self.pool)
            .await?;
        let logs = rows.iter().map(row_to_log).collect::<Result<Vec<_>, _>>()?;
        Ok((logs, total))
    }
}

pub struct PostgresUsageLimitRepository {
    pool: Pool<Postgres>,
}

impl PostgresUsageLimitRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_limit(r: &PgRow) -> Result<UsageLimit, Error> {
    Ok(UsageLimit {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        daily_limit: r.try_get("daily_limit")?,
        weekly_limit: r.try_get("weekly_limit")?,
        monthly_limit: r.try_get("monthly_limit")?,
        alert_threshold: r.try_get("alert_threshold")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl UsageLimitRepository for PostgresUsageLimitRepository {
    async fn get(&self, user_id: Uuid) -> Result<Option<UsageLimit>, Error> {
        let row = sqlx::query("SELECT * FROM usage_limits WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_limit).transpose()
    }

    async fn get_or_create(&self, limit: &UsageLimit) -> Result<UsageLimit, Error> {
        sqlx::query(
            r#"
            INSERT INTO usage_limits (
                id, user_id, daily_limit, weekly_limit, monthly_limit, alert_threshold, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
            .bind(limit.id)
            .bind(limit.user_id)
            .bind(limit.daily_limit)
            .bind(limit.weekly_limit)
            .bind(limit.monthly_limit)
            .bind(limit.alert_threshold)
            .bind(limit.created_at)
            .bind(limit.updated_at)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT * FROM usage_limits WHERE user_id = $1")
            .bind(limit.user_id)
            .fetch_one(&self.pool)
            .await?;
        row_to_limit(&row)
    }

    async fn upsert(&self, limit: &UsageLimit) -> Result<UsageLimit, Error> {
        let row = sqlx::query(
            r#"
            INSERT INTO usage_limits (
                id, user_id, daily_limit, weekly_limit, monthly_limit, alert_threshold, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO UPDATE
            SET daily_limit = EXCLUDED.daily_limit,
                weekly_limit = EXCLUDED.weekly_limit,
                monthly_limit = EXCLUDED.monthly_limit,
                alert_threshold = EXCLUDED.alert_threshold,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
            .bind(limit.id)
            .bind(limit.user_id)
            .bind(limit.daily_limit)
            .bind(limit.weekly_limit)
            .bind(limit.monthly_limit)
            .bind(limit.alert_threshold)
            .bind(limit.created_at)
            .bind(limit.updated_at)
            .fetch_one(&self.pool)
            .await?;
        row_to_limit(&row)
    }
}
