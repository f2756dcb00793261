// src/repositories/postgres/user.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use voltledger_common::models::{PageRequest, User, Wallet};
use voltledger_common::traits::UserRepository;
use crate::Error;

pub struct PostgresUserRepository {
    pool: Pool<Postgres>,
}

impl PostgresUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = r#"
    id, email, password_hash, first_name, last_name, phone, role, language,
    firebase_uid, push_token, profile_image, is_active, created_at, updated_at
"#;

pub(crate) fn row_to_user(r: &PgRow) -> Result<User, Error> {
    Ok(User {
        id: r.try_get("id")?,
        email: r.try_get("email")?,
        password_hash: r.try_get("password_hash")?,
        first_name: r.try_get("first_name")?,
        last_name: r.try_get("last_name")?,
        phone: r.try_get("phone")?,
        role: r.try_get::<String, _>("role")?.parse()?,
        language: r.try_get::<String, _>("language")?.parse()?,
        firebase_uid: r.try_get("firebase_uid")?,
        push_token: r.try_get("push_token")?,
        profile_image: r.try_get("profile_image")?,
        is_active: r.try_get("is_active")?,
        created_at: r.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: r.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create_with_wallet(&self, user: &User) -> Result<Wallet, Error> {
        let wallet = Wallet::new(user.id);
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, first_name, last_name, phone, role, language,
                firebase_uid, push_token, profile_image, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone)
            .bind(user.role.to_string())
            .bind(user.language.to_string())
            .bind(&user.firebase_uid)
            .bind(&user.push_token)
            .bind(&user.profile_image)
            .bind(user.is_active)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO wallets (id, user_id, balance, cash_balance, total_earned, total_spent, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
            .bind(wallet.id)
            .bind(wallet.user_id)
            .bind(wallet.balance)
            .bind(wallet.cash_balance)
            .bind(wallet.total_earned)
            .bind(wallet.total_spent)
            .bind(wallet.created_at)
            .bind(wallet.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(wallet)
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, Error> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_firebase_uid(&self, uid: &str) -> Result<Option<User>, Error> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE firebase_uid = $1"))
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn update(&self, user: &User) -> Result<(), Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET first_name = $1,
                last_name = $2,
                phone = $3,
                role = $4,
                language = $5,
                firebase_uid = $6,
                push_token = $7,
                profile_image = $8,
                is_active = $9,
                password_hash = $10,
                updated_at = $11
            WHERE id = $12
            "#,
        )
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone)
            .bind(user.role.to_string())
            .bind(user.language.to_string())
            .bind(&user.firebase_uid)
            .bind(&user.push_token)
            .bind(&user.profile_image)
            .bind(user.is_active)
            .bind(&user.password_hash)
            .bind(user.updated_at)
            .bind(user.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("User {} not found", user.id)));
        }
        Ok(())
    }

    async fn list(&self, page: PageRequest) -> Result<(Vec<User>, i64), Error> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let users = rows.iter().map(row_to_user).collect::<Result<Vec<_>, _>>()?;
        Ok((users, total))
    }
}
