// src/repositories/postgres/transaction.rs

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Pool, Postgres, Row};
use tracing::info;
use uuid::Uuid;

use voltledger_common::models::{
    PageRequest, SettlementOutcome, Transaction, TransactionStatus, TransactionType, WalletAdjustment,
};
use voltledger_common::traits::TransactionRepository;
use crate::repositories::postgres::wallet::adjust_locked;
use crate::Error;

pub struct PostgresTransactionRepository {
    pool: Pool<Postgres>,
}

impl PostgresTransactionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_transaction(r: &PgRow) -> Result<Transaction, Error> {
    let payment_method: Option<String> = r.try_get("payment_method")?;
    Ok(Transaction {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        tx_type: r.try_get::<String, _>("tx_type")?.parse()?,
        status: r.try_get::<String, _>("status")?.parse()?,
        amount: r.try_get("amount")?,
        quantity: r.try_get("quantity")?,
        reference: r.try_get("reference")?,
        payment_method: payment_method.map(|m| m.parse()).transpose()?,
        company_id: r.try_get("company_id")?,
        token_id: r.try_get("token_id")?,
        metadata: r.try_get("metadata")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

pub(crate) async fn insert_transaction(conn: &mut PgConnection, tx: &Transaction) -> Result<(), Error> {
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, user_id, tx_type, status, amount, quantity, reference, payment_method,
            company_id, token_id, metadata, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
        .bind(tx.id)
        .bind(tx.user_id)
        .bind(tx.tx_type.to_string())
        .bind(tx.status.to_string())
        .bind(tx.amount)
        .bind(tx.quantity)
        .bind(&tx.reference)
        .bind(tx.payment_method.map(|m| m.to_string()))
        .bind(tx.company_id)
        .bind(tx.token_id)
        .bind(&tx.metadata)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .execute(conn)
        .await?;
    Ok(())
}

/// Shallow-merges `extra` into `base` when both are objects.
pub(crate) fn merge_metadata(base: &mut Value, extra: Value) {
    match (base, extra) {
        (_, Value::Null) => {}
        (Value::Object(dst), Value::Object(src)) => {
            for (k, v) in src {
                dst.insert(k, v);
            }
        }
        (dst, src) => {
            let previous = std::mem::take(dst);
            *dst = serde_json::json!({ "original": previous, "gateway": src });
        }
    }
}

/// Wallet side effect of moving a purchase into `status`.
pub(crate) fn purchase_adjustment(tx: &Transaction, status: TransactionStatus) -> Option<WalletAdjustment> {
    if tx.tx_type != TransactionType::Purchase {
        return None;
    }
    let quantity = tx.quantity?;
    match status {
        TransactionStatus::Success => Some(WalletAdjustment::credit_energy(quantity)),
        TransactionStatus::Refunded => Some(WalletAdjustment::debit_energy(quantity)),
        _ => None,
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn insert(&self, tx: &Transaction) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;
        insert_transaction(&mut *conn, tx).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Transaction>, Error> {
        let row = sqlx::query("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_transaction).transpose()
    }

    async fn get_by_reference(&self, reference: &str) -> Result<Option<Transaction>, Error> {
        let row = sqlx::query("SELECT * FROM transactions WHERE reference = $1")
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_transaction).transpose()
    }

    async fn list_for_user(&self, user_id: Uuid, page: PageRequest) -> Result<(Vec<Transaction>, i64), Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
            .bind(user_id)
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        let txs = rows.iter().map(row_to_transaction).collect::<Result<Vec<_>, _>>()?;
        Ok((txs, total))
    }

    async fn count_for_company(&self, company_id: Uuid) -> Result<i64, Error> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE company_id = $1")
            .bind(company_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn settle_purchase(
        &self,
        reference: &str,
        outcome: SettlementOutcome,
        gateway_data: Value,
    ) -> Result<Transaction, Error> {
        let mut db_tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM transactions WHERE reference = $1 FOR UPDATE")
            .bind(reference)
            .fetch_optional(&mut *db_tx)
            .await?;
        let mut tx = match row {
            Some(r) => row_to_transaction(&r)?,
            None => return Err(Error::NotFound("Transaction not found".into())),
        };

        let next = tx.status.transition(outcome)?;
        tx.status = next;
        tx.updated_at = Utc::now();
        merge_metadata(&mut tx.metadata, gateway_data);

        sqlx::query("UPDATE transactions SET status = $1, metadata = $2, updated_at = $3 WHERE id = $4")
            .bind(tx.status.to_string())
            .bind(&tx.metadata)
            .bind(tx.updated_at)
            .bind(tx.id)
            .execute(&mut *db_tx)
            .await?;

        if let Some(adj) = purchase_adjustment(&tx, next) {
            adjust_locked(&mut *db_tx, tx.user_id, adj).await?;
        }

        db_tx.commit().await?;
        info!("Transaction {} settled as {}", tx.reference, tx.status);
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_merge_keeps_existing_keys() {
        let mut base = json!({"tokenId": "t1", "quantity": 10});
        merge_metadata(&mut base, json!({"gatewayId": 99}));
        assert_eq!(base, json!({"tokenId": "t1", "quantity": 10, "gatewayId": 99}));

        let mut untouched = json!({"a": 1});
        merge_metadata(&mut untouched, Value::Null);
        assert_eq!(untouched, json!({"a": 1}));
    }
}
