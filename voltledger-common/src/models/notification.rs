// File: voltledger-common/src/models/notification.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    UsageAlert,
    PaymentSuccess,
    PaymentFailed,
    CarbonCreditEarned,
    LowBalance,
    SystemUpdate,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationType::UsageAlert => "usage_alert",
            NotificationType::PaymentSuccess => "payment_success",
            NotificationType::PaymentFailed => "payment_failed",
            NotificationType::CarbonCreditEarned => "carbon_credit_earned",
            NotificationType::LowBalance => "low_balance",
            NotificationType::SystemUpdate => "system_update",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for NotificationType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "usage_alert" => Ok(NotificationType::UsageAlert),
            "payment_success" => Ok(NotificationType::PaymentSuccess),
            "payment_failed" => Ok(NotificationType::PaymentFailed),
            "carbon_credit_earned" => Ok(NotificationType::CarbonCreditEarned),
            "low_balance" => Ok(NotificationType::LowBalance),
            "system_update" => Ok(NotificationType::SystemUpdate),
            _ => Err(format!("Unknown notification type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub body: String,
    pub data: Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: Uuid, kind: NotificationType, title: String, body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            title,
            body,
            data: Value::Null,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}
