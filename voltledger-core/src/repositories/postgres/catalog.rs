// src/repositories/postgres/catalog.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use voltledger_common::models::{Company, Token, TokenDraft};
use voltledger_common::traits::CatalogRepository;
use crate::Error;

pub struct PostgresCatalogRepository {
    pool: Pool<Postgres>,
}

impl PostgresCatalogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_company(r: &PgRow) -> Result<Company, Error> {
    Ok(Company {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        slug: r.try_get("slug")?,
        description: r.try_get("description")?,
        logo: r.try_get("logo")?,
        is_active: r.try_get("is_active")?,
        support_email: r.try_get("support_email")?,
        support_phone: r.try_get("support_phone")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn row_to_token(r: &PgRow) -> Result<Token, Error> {
    Ok(Token {
        id: r.try_get("id")?,
        company_id: r.try_get("company_id")?,
        company_name: r.try_get("company_name")?,
        token_type: r.try_get::<String, _>("token_type")?.parse()?,
        price_per_unit: r.try_get("price_per_unit")?,
        is_available: r.try_get("is_available")?,
        description: r.try_get("description")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

const TOKEN_SELECT: &str = r#"
    SELECT t.id, t.company_id, c.name AS company_name, t.token_type, t.price_per_unit,
           t.is_available, t.description, t.created_at, t.updated_at
    FROM tokens t
    JOIN companies c ON c.id = t.company_id
"#;

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn create_company(&self, company: &Company) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO companies (
                id, name, slug, description, logo, is_active, support_email, support_phone,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
            .bind(company.id)
            .bind(&company.name)
            .bind(&company.slug)
            .bind(&company.description)
            .bind(&company.logo)
            .bind(company.is_active)
            .bind(&company.support_email)
            .bind(&company.support_phone)
            .bind(company.created_at)
            .bind(company.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_company(&self, id: Uuid) -> Result<Option<Company>, Error> {
        let row = sqlx::query("SELECT * FROM companies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_company).transpose()
    }

    async fn list_companies(&self, active_only: bool) -> Result<Vec<Company>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM companies
            WHERE ($1 = FALSE OR is_active = TRUE)
            ORDER BY name ASC
            "#,
        )
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_company).collect()
    }

    async fn update_company(&self, company: &Company) -> Result<(), Error> {
        let result = sqlx::query(
            r#"
            UPDATE companies
            SET name = $1, slug = $2, description = $3, logo = $4, is_active = $5,
                support_email = $6, support_phone = $7, updated_at = $8
            WHERE id = $9
            "#,
        )
            .bind(&company.name)
            .bind(&company.slug)
            .bind(&company.description)
            .bind(&company.logo)
            .bind(company.is_active)
            .bind(&company.support_email)
            .bind(&company.support_phone)
            .bind(company.updated_at)
            .bind(company.id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Company not found".into()));
        }
        Ok(())
    }

    async fn delete_company(&self, id: Uuid) -> Result<(), Error> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Company not found".into()));
        }
        Ok(())
    }

    async fn create_token(&self, draft: &TokenDraft) -> Result<Token, Error> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO tokens (id, company_id, token_type, price_per_unit, is_available, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
            .bind(id)
            .bind(draft.company_id)
            .bind(draft.token_type.to_string())
            .bind(draft.price_per_unit)
            .bind(draft.is_available.unwrap_or(true))
            .bind(&draft.description)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;

        self.get_token(id)
            .await?
            .ok_or_else(|| Error::Internal("token vanished after insert".into()))
    }

    async fn get_token(&self, id: Uuid) -> Result<Option<Token>, Error> {
        let row = sqlx::query(&format!("{TOKEN_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_token).transpose()
    }

    async fn list_tokens(&self, company_id: Option<Uuid>, available_only: bool) -> Result<Vec<Token>, Error> {
        let rows = sqlx::query(&format!(
            r#"{TOKEN_SELECT}
            WHERE ($1::uuid IS NULL OR t.company_id = $1)
              AND ($2 = FALSE OR (t.is_available = TRUE AND c.is_active = TRUE))
            ORDER BY t.price_per_unit ASC
            "#
        ))
            .bind(company_id)
            .bind(available_only)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_token).collect()
    }

    async fn update_token(&self, token: &Token) -> Result<(), Error> {
        let result = sqlx::query(
            r#"
            UPDATE tokens
            SET price_per_unit = $1, is_available = $2, description = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
            .bind(token.price_per_unit)
            .bind(token.is_available)
            .bind(&token.description)
            .bind(token.updated_at)
            .bind(token.id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Token not found".into()));
        }
        Ok(())
    }
}
