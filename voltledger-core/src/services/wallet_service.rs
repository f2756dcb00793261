// File: voltledger-core/src/services/wallet_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use voltledger_common::models::{BalanceOp, Wallet, WalletAccount, WalletAdjustment};
use voltledger_common::traits::WalletRepository;
use crate::Error;

pub struct WalletService {
    wallets: Arc<dyn WalletRepository>,
}

impl WalletService {
    pub fn new(wallets: Arc<dyn WalletRepository>) -> Self {
        Self { wallets }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Wallet, Error> {
        self.wallets
            .get_by_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Wallet not found".into()))
    }

    /// Adds to or subtracts from the energy balance.
    pub async fn update_balance(&self, user_id: Uuid, amount: Decimal, op: BalanceOp) -> Result<Wallet, Error> {
        self.wallets
            .adjust(user_id, WalletAdjustment { account: WalletAccount::Energy, op, amount })
            .await
    }
}
