// File: voltledger-common/src/models/wallet.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::error::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Energy balance in kWh.
    pub balance: Decimal,
    /// Currency balance.
    pub cash_balance: Decimal,
    pub total_earned: Decimal,
    pub total_spent: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletAccount {
    Energy,
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceOp {
    Add,
    Subtract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletAdjustment {
    pub account: WalletAccount,
    pub op: BalanceOp,
    pub amount: Decimal,
}

impl WalletAdjustment {
    pub fn credit_energy(amount: Decimal) -> Self {
        Self { account: WalletAccount::Energy, op: BalanceOp::Add, amount }
    }

    pub fn debit_energy(amount: Decimal) -> Self {
        Self { account: WalletAccount::Energy, op: BalanceOp::Subtract, amount }
    }

    pub fn credit_cash(amount: Decimal) -> Self {
        Self { account: WalletAccount::Cash, op: BalanceOp::Add, amount }
    }
}

impl Wallet {
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            balance: Decimal::ZERO,
            cash_balance: Decimal::ZERO,
            total_earned: Decimal::ZERO,
            total_spent: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies an adjustment in place. On error the wallet is left untouched.
    ///
    /// Cumulative counters follow the energy account only.
    pub fn apply(&mut self, adj: WalletAdjustment) -> Result<(), Error> {
        if adj.amount < Decimal::ZERO {
            return Err(Error::BadRequest("Adjustment amount must not be negative".into()));
        }

        let current = match adj.account {
            WalletAccount::Energy => self.balance,
            WalletAccount::Cash => self.cash_balance,
        };
        let next = match adj.op {
            BalanceOp::Add => current + adj.amount,
            BalanceOp::Subtract => current - adj.amount,
        };
        if next < Decimal::ZERO {
            return Err(Error::BadRequest("Insufficient wallet balance".into()));
        }

        match adj.account {
            WalletAccount::Energy => {
                self.balance = next;
                match adj.op {
                    BalanceOp::Add => self.total_earned += adj.amount,
                    BalanceOp::Subtract => self.total_spent += adj.amount,
                }
            }
            WalletAccount::Cash => self.cash_balance = next,
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn add_energy_bumps_total_earned() {
        let mut w = Wallet::new(Uuid::new_v4());
        w.apply(WalletAdjustment::credit_energy(dec!(12.5))).unwrap();
        assert_eq!(w.balance, dec!(12.5));
        assert_eq!(w.total_earned, dec!(12.5));
        assert_eq!(w.total_spent, Decimal::ZERO);
    }

    #[test]
    fn overdraft_is_rejected_and_balance_unchanged() {
        let mut w = Wallet::new(Uuid::new_v4());
        w.apply(WalletAdjustment::credit_energy(dec!(5))).unwrap();
        let before = w.clone();

        let err = w.apply(WalletAdjustment::debit_energy(dec!(5.01))).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(w, before);
    }

    #[test]
    fn subtract_to_exactly_zero_is_allowed() {
        let mut w = Wallet::new(Uuid::new_v4());
        w.apply(WalletAdjustment::credit_energy(dec!(3))).unwrap();
        w.apply(WalletAdjustment::debit_energy(dec!(3))).unwrap();
        assert_eq!(w.balance, Decimal::ZERO);
        assert_eq!(w.total_spent, dec!(3));
    }

    #[test]
    fn cash_credit_leaves_energy_counters_alone() {
        let mut w = Wallet::new(Uuid::new_v4());
        w.apply(WalletAdjustment::credit_cash(dec!(7500))).unwrap();
        assert_eq!(w.cash_balance, dec!(7500));
        assert_eq!(w.total_earned, Decimal::ZERO);
    }
}
