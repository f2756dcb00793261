// File: voltledger-common/src/models/catalog.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    Renewable,
    NonRenewable,
}

impl TokenType {
    pub fn is_renewable(&self) -> bool {
        matches!(self, TokenType::Renewable)
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Renewable => write!(f, "RENEWABLE"),
            TokenType::NonRenewable => write!(f, "NON_RENEWABLE"),
        }
    }
}

impl FromStr for TokenType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RENEWABLE" => Ok(TokenType::Renewable),
            "NON_RENEWABLE" => Ok(TokenType::NonRenewable),
            _ => Err(format!("Unknown token type: {}", s)),
        }
    }
}

/// An energy supplier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub is_active: bool,
    pub support_email: Option<String>,
    pub support_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDraft {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub is_active: Option<bool>,
    pub support_email: Option<String>,
    pub support_phone: Option<String>,
}

impl CompanyDraft {
    pub fn into_company(self) -> Company {
        let now = Utc::now();
        Company {
            id: Uuid::new_v4(),
            name: self.name,
            slug: self.slug,
            description: self.description,
            logo: self.logo,
            is_active: self.is_active.unwrap_or(true),
            support_email: self.support_email,
            support_phone: self.support_phone,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A purchasable energy product. `company_name` is read through the owning company.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub price_per_unit: Decimal,
    pub is_available: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDraft {
    pub company_id: Uuid,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub price_per_unit: Decimal,
    pub is_available: Option<bool>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUpdate {
    pub price_per_unit: Option<Decimal>,
    pub is_available: Option<bool>,
    pub description: Option<String>,
}

impl TokenUpdate {
    pub fn apply_to(&self, token: &mut Token) {
        if let Some(p) = self.price_per_unit {
            token.price_per_unit = p;
        }
        if let Some(a) = self.is_available {
            token.is_available = a;
        }
        if let Some(d) = &self.description {
            token.description = Some(d.clone());
        }
        token.updated_at = Utc::now();
    }
}
