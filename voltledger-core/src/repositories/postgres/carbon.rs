// src/repositories/postgres/carbon.rs

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::info;
use uuid::Uuid;

use voltledger_common::models::{
    CarbonCredit, CreditSettlement, MonetizationQuote, MonetizeAction, PageRequest, Transaction,
    TransactionStatus, TransactionType, WalletAdjustment,
};
use voltledger_common::traits::CarbonCreditRepository;
use crate::repositories::postgres::transaction::insert_transaction;
use crate::repositories::postgres::wallet::adjust_locked;
use crate::Error;

pub struct PostgresCarbonCreditRepository {
    pool: Pool<Postgres>,
}

impl PostgresCarbonCreditRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_credit(r: &PgRow) -> Result<CarbonCredit, Error> {
    Ok(CarbonCredit {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        amount: r.try_get("amount")?,
        source: r.try_get("source")?,
        renewable_kwh: r.try_get("renewable_kwh")?,
        is_sold: r.try_get("is_sold")?,
        sold_at: r.try_get("sold_at")?,
        sold_price: r.try_get("sold_price")?,
        created_at: r.try_get("created_at")?,
    })
}

/// Builds the journal entry for a settled batch.
pub(crate) fn settlement_transaction(
    settlement: &CreditSettlement,
    quote: &MonetizationQuote,
) -> Transaction {
    let mut tx = Transaction::new(
        settlement.user_id,
        TransactionType::CarbonCreditSale,
        TransactionStatus::Success,
        quote.total_amount,
        settlement.reference.clone(),
    );
    tx.quantity = quote.kwh_granted;
    tx.metadata = json!({
        "creditIds": settlement.credit_ids,
        "totalCredits": quote.total_credits,
        "pricePerCredit": settlement.policy.credit_price,
        "action": settlement.action.to_string(),
    });
    tx
}

pub(crate) fn settlement_adjustment(action: MonetizeAction, quote: &MonetizationQuote) -> WalletAdjustment {
    match action {
        MonetizeAction::SellToCash => WalletAdjustment::credit_cash(quote.total_amount),
        MonetizeAction::ConvertToTokens => {
            WalletAdjustment::credit_energy(quote.kwh_granted.unwrap_or(Decimal::ZERO))
        }
    }
}

#[async_trait]
impl CarbonCreditRepository for PostgresCarbonCreditRepository {
    async fn insert(&self, credit: &CarbonCredit) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO carbon_credits (
                id, user_id, amount, source, renewable_kwh, is_sold, sold_at, sold_price, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
            .bind(credit.id)
            .bind(credit.user_id)
            .bind(credit.amount)
            .bind(&credit.source)
            .bind(credit.renewable_kwh)
            .bind(credit.is_sold)
            .bind(credit.sold_at)
            .bind(credit.sold_price)
            .bind(credit.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid, include_sold: bool) -> Result<Vec<CarbonCredit>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM carbon_credits
            WHERE user_id = $1
              AND ($2 = TRUE OR is_sold = FALSE)
            ORDER BY created_at DESC
            "#,
        )
            .bind(user_id)
            .bind(include_sold)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_credit).collect()
    }

    async fn list_all(&self, page: PageRequest) -> Result<(Vec<CarbonCredit>, i64), Error> {
        let rows = sqlx::query("SELECT * FROM carbon_credits ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM carbon_credits")
            .fetch_one(&self.pool)
            .await?;
        let credits = rows.iter().map(row_to_credit).collect::<Result<Vec<_>, _>>()?;
        Ok((credits, total))
    }

    async fn settle(&self, settlement: &CreditSettlement) -> Result<(MonetizationQuote, Transaction), Error> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM carbon_credits
            WHERE id = ANY($1)
              AND user_id = $2
              AND is_sold = FALSE
            FOR UPDATE
            "#,
        )
            .bind(&settlement.credit_ids)
            .bind(settlement.user_id)
            .fetch_all(&mut *tx)
            .await?;

        if rows.len() != settlement.credit_ids.len() {
            return Err(Error::BadRequest(
                "Some carbon credits are invalid or already sold".into(),
            ));
        }
        let credits = rows.iter().map(row_to_credit).collect::<Result<Vec<_>, _>>()?;
        let total_credits: Decimal = credits.iter().map(|c| c.amount).sum();
        let quote = settlement.policy.quote(total_credits, settlement.action);

        sqlx::query(
            r#"
            UPDATE carbon_credits
            SET is_sold = TRUE, sold_at = $1, sold_price = $2
            WHERE id = ANY($3)
            "#,
        )
            .bind(Utc::now())
            .bind(settlement.policy.credit_price)
            .bind(&settlement.credit_ids)
            .execute(&mut *tx)
            .await?;

        adjust_locked(&mut *tx, settlement.user_id, settlement_adjustment(settlement.action, &quote)).await?;

        let journal = settlement_transaction(settlement, &quote);
        insert_transaction(&mut *tx, &journal).await?;

        tx.commit().await?;
        info!(
            "Settled {} carbon credit(s) for user {} via {} => {}",
            total_credits, settlement.user_id, settlement.action, quote.total_amount
        );
        Ok((quote, journal))
    }
}
