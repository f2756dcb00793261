// File: voltledger-common/src/models/transaction.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use crate::error::Error;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Purchase,
    Usage,
    CarbonCreditSale,
    Refund,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Purchase => write!(f, "PURCHASE"),
            TransactionType::Usage => write!(f, "USAGE"),
            TransactionType::CarbonCreditSale => write!(f, "CARBON_CREDIT_SALE"),
            TransactionType::Refund => write!(f, "REFUND"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PURCHASE" => Ok(TransactionType::Purchase),
            "USAGE" => Ok(TransactionType::Usage),
            "CARBON_CREDIT_SALE" => Ok(TransactionType::CarbonCreditSale),
            "REFUND" => Ok(TransactionType::Refund),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "PENDING"),
            TransactionStatus::Success => write!(f, "SUCCESS"),
            TransactionStatus::Failed => write!(f, "FAILED"),
            TransactionStatus::Refunded => write!(f, "REFUNDED"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TransactionStatus::Pending),
            "SUCCESS" => Ok(TransactionStatus::Success),
            "FAILED" => Ok(TransactionStatus::Failed),
            "REFUNDED" => Ok(TransactionStatus::Refunded),
            _ => Err(format!("Unknown transaction status: {}", s)),
        }
    }
}

/// Terminal outcome reported for a pending purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Success,
    Failed,
    Refund,
}

impl TransactionStatus {
    /// PENDING -> SUCCESS | FAILED, SUCCESS -> REFUNDED. Anything else is rejected.
    pub fn transition(self, outcome: SettlementOutcome) -> Result<TransactionStatus, Error> {
        use TransactionStatus::*;
        match (self, outcome) {
            (Pending, SettlementOutcome::Success) => Ok(Success),
            (Pending, SettlementOutcome::Failed) => Ok(Failed),
            (Success, SettlementOutcome::Refund) => Ok(Refunded),
            _ => Err(Error::BadRequest("Transaction already processed".into())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Paystack,
    Stripe,
    Card,
    Bank,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Paystack => write!(f, "paystack"),
            PaymentMethod::Stripe => write!(f, "stripe"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Bank => write!(f, "bank"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paystack" => Ok(PaymentMethod::Paystack),
            "stripe" => Ok(PaymentMethod::Stripe),
            "card" => Ok(PaymentMethod::Card),
            "bank" => Ok(PaymentMethod::Bank),
            _ => Err(format!("Unknown payment method: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub quantity: Option<Decimal>,
    pub reference: String,
    pub payment_method: Option<PaymentMethod>,
    pub company_id: Option<Uuid>,
    pub token_id: Option<Uuid>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        user_id: Uuid,
        tx_type: TransactionType,
        status: TransactionStatus,
        amount: Decimal,
        reference: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            tx_type,
            status,
            amount,
            quantity: None,
            reference,
            payment_method: None,
            company_id: None,
            token_id: None,
            metadata: Value::Null,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_settles_once() {
        assert_eq!(
            TransactionStatus::Pending.transition(SettlementOutcome::Success).unwrap(),
            TransactionStatus::Success
        );
        assert_eq!(
            TransactionStatus::Pending.transition(SettlementOutcome::Failed).unwrap(),
            TransactionStatus::Failed
        );
        assert!(matches!(
            TransactionStatus::Success.transition(SettlementOutcome::Success),
            Err(Error::BadRequest(_))
        ));
        assert!(TransactionStatus::Failed.transition(SettlementOutcome::Success).is_err());
    }

    #[test]
    fn only_successful_transactions_refund() {
        assert_eq!(
            TransactionStatus::Success.transition(SettlementOutcome::Refund).unwrap(),
            TransactionStatus::Refunded
        );
        assert!(TransactionStatus::Pending.transition(SettlementOutcome::Refund).is_err());
        assert!(TransactionStatus::Refunded.transition(SettlementOutcome::Refund).is_err());
    }
}
