// File: voltledger-common/src/models/payment.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Returned by the gateway when a checkout is opened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInit {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Failed,
    Abandoned,
    Pending,
}

impl PaymentStatus {
    pub fn from_gateway(s: &str) -> Self {
        match s {
            "success" => PaymentStatus::Success,
            "abandoned" => PaymentStatus::Abandoned,
            "ongoing" | "pending" | "processing" | "queued" => PaymentStatus::Pending,
            _ => PaymentStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub reference: String,
    pub status: PaymentStatus,
    /// Major currency units.
    pub amount: Decimal,
    pub currency: String,
    pub gateway_id: Option<String>,
    pub metadata: Value,
}

/// A checkout to open with the gateway. `reference` doubles as the idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub email: String,
    pub amount: Decimal,
    pub reference: String,
    pub callback_url: String,
    pub metadata: Value,
}
