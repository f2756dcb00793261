// File: voltledger-common/src/models/carbon.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of renewable-usage reward. `is_sold` flips false -> true once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CarbonCredit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    /// Supplier company name.
    pub source: String,
    pub renewable_kwh: Decimal,
    pub is_sold: bool,
    pub sold_at: Option<DateTime<Utc>>,
    pub sold_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl CarbonCredit {
    pub fn new(user_id: Uuid, amount: Decimal, source: &str, renewable_kwh: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount,
            source: source.to_string(),
            renewable_kwh,
            is_sold: false,
            sold_at: None,
            sold_price: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MonetizeAction {
    SellToCash,
    ConvertToTokens,
}

impl MonetizeAction {
    /// Label reported back to the caller once the action has run.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            MonetizeAction::SellToCash => "sold_to_cash",
            MonetizeAction::ConvertToTokens => "converted_to_tokens",
        }
    }
}

impl fmt::Display for MonetizeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonetizeAction::SellToCash => write!(f, "sell_to_cash"),
            MonetizeAction::ConvertToTokens => write!(f, "convert_to_tokens"),
        }
    }
}

impl FromStr for MonetizeAction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sell_to_cash" => Ok(MonetizeAction::SellToCash),
            "convert_to_tokens" => Ok(MonetizeAction::ConvertToTokens),
            _ => Err(format!("Invalid action specified: {}", s)),
        }
    }
}

/// Conversion constants for credit accrual and monetization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbonPolicy {
    /// kWh of renewable usage per credit.
    pub credit_ratio: Decimal,
    /// Cash value of one credit.
    pub credit_price: Decimal,
    /// kg CO2 avoided per renewable kWh.
    pub co2_per_kwh: Decimal,
    pub trees_per_credit: Decimal,
    /// Cash value of one kWh when credits are converted to energy.
    pub conversion_kwh_price: Decimal,
}

impl Default for CarbonPolicy {
    fn default() -> Self {
        Self {
            credit_ratio: Decimal::from(10),
            credit_price: Decimal::from(750),
            co2_per_kwh: Decimal::new(5, 1),
            trees_per_credit: Decimal::new(5, 1),
            conversion_kwh_price: Decimal::from(75),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditAccrual {
    pub credits_earned: Decimal,
    pub co2_reduction: Decimal,
    pub equivalent_trees: Decimal,
}

/// What a batch of credits is worth under a given action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonetizationQuote {
    pub total_credits: Decimal,
    pub total_amount: Decimal,
    /// kWh granted; only set for conversions.
    pub kwh_granted: Option<Decimal>,
}

impl CarbonPolicy {
    pub fn accrue(&self, renewable_kwh: Decimal) -> CreditAccrual {
        let credits_earned = if renewable_kwh <= Decimal::ZERO || self.credit_ratio.is_zero() {
            Decimal::ZERO
        } else {
            (renewable_kwh / self.credit_ratio).floor()
        };
        CreditAccrual {
            credits_earned,
            co2_reduction: renewable_kwh * self.co2_per_kwh,
            equivalent_trees: credits_earned * self.trees_per_credit,
        }
    }

    pub fn quote(&self, total_credits: Decimal, action: MonetizeAction) -> MonetizationQuote {
        let total_amount = total_credits * self.credit_price;
        let kwh_granted = match action {
            MonetizeAction::SellToCash => None,
            MonetizeAction::ConvertToTokens if self.conversion_kwh_price.is_zero() => Some(Decimal::ZERO),
            MonetizeAction::ConvertToTokens => Some(total_amount / self.conversion_kwh_price),
        };
        MonetizationQuote { total_credits, total_amount, kwh_granted }
    }
}

/// Everything a repository needs to settle a batch of credits in one unit of work.
#[derive(Debug, Clone)]
pub struct CreditSettlement {
    pub user_id: Uuid,
    pub credit_ids: Vec<Uuid>,
    pub action: MonetizeAction,
    pub reference: String,
    pub policy: CarbonPolicy,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonetizationResult {
    pub credits_monetized: Decimal,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_received: Option<Decimal>,
    pub action: String,
    pub reference: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CarbonCreditStats {
    pub total_credits_earned: Decimal,
    pub credits_sold: Decimal,
    pub credits_available: Decimal,
    pub total_earnings: Decimal,
}

impl CarbonCreditStats {
    pub fn from_credits(credits: &[CarbonCredit]) -> Self {
        credits.iter().fold(Self::default(), |mut acc, c| {
            acc.total_credits_earned += c.amount;
            if c.is_sold {
                acc.credits_sold += c.amount;
                acc.total_earnings += c.amount * c.sold_price.unwrap_or_default();
            } else {
                acc.credits_available += c.amount;
            }
            acc
        })
    }
}
