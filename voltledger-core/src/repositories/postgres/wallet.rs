// src/repositories/postgres/wallet.rs

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use voltledger_common::models::{Wallet, WalletAdjustment};
use voltledger_common::traits::WalletRepository;
use crate::Error;

pub struct PostgresWalletRepository {
    pool: Pool<Postgres>,
}

impl PostgresWalletRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_wallet(r: &PgRow) -> Result<Wallet, Error> {
    Ok(Wallet {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        balance: r.try_get("balance")?,
        cash_balance: r.try_get("cash_balance")?,
        total_earned: r.try_get("total_earned")?,
        total_spent: r.try_get("total_spent")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

/// Locks the user's wallet row on `conn`, applies `adj` and writes it back.
/// The caller owns the surrounding transaction.
pub(crate) async fn adjust_locked(
    conn: &mut PgConnection,
    user_id: Uuid,
    adj: WalletAdjustment,
) -> Result<Wallet, Error> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, balance, cash_balance, total_earned, total_spent, created_at, updated_at
        FROM wallets
        WHERE user_id = $1
        FOR UPDATE
        "#,
    )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    let mut wallet = match row {
        Some(r) => row_to_wallet(&r)?,
        None => return Err(Error::NotFound("Wallet not found".into())),
    };
    wallet.apply(adj)?;

    sqlx::query(
        r#"
        UPDATE wallets
        SET balance = $1,
            cash_balance = $2,
            total_earned = $3,
            total_spent = $4,
            updated_at = $5
        WHERE id = $6
        "#,
    )
        .bind(wallet.balance)
        .bind(wallet.cash_balance)
        .bind(wallet.total_earned)
        .bind(wallet.total_spent)
        .bind(wallet.updated_at)
        .bind(wallet.id)
        .execute(&mut *conn)
        .await?;

    debug!("wallet {} adjusted: {:?}", wallet.id, adj);
    Ok(wallet)
}

#[async_trait]
impl WalletRepository for PostgresWalletRepository {
    async fn get_by_user(&self, user_id: Uuid) -> Result<Option<Wallet>, Error> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, balance, cash_balance, total_earned, total_spent, created_at, updated_at
            FROM wallets
            WHERE user_id = $1
            "#,
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_wallet).transpose()
    }

    async fn adjust(&self, user_id: Uuid, adj: WalletAdjustment) -> Result<Wallet, Error> {
        let mut tx = self.pool.begin().await?;
        let wallet = adjust_locked(&mut *tx, user_id, adj).await?;
        tx.commit().await?;
        Ok(wallet)
    }
}
