// File: voltledger-common/src/traits/repository_traits.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;
use crate::error::Error;
use crate::models::{
    CarbonCredit, ChatMessage, ChatSession, Company, CreditSettlement, MonetizationQuote,
    Notification, PageRequest, SettlementOutcome, Token, TokenDraft, Transaction, UsageBreakdown,
    UsageLimit, UsageLog, User, Wallet, WalletAdjustment,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts the user and an empty wallet in one unit of work.
    async fn create_with_wallet(&self, user: &User) -> Result<Wallet, Error>;
    async fn get(&self, id: Uuid) -> Result<Option<User>, Error>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, Error>;
    async fn get_by_firebase_uid(&self, uid: &str) -> Result<Option<User>, Error>;
    async fn update(&self, user: &User) -> Result<(), Error>;
    async fn list(&self, page: PageRequest) -> Result<(Vec<User>, i64), Error>;
}

#[async_trait]
pub trait WalletRepository: Send + Sync {
    async fn get_by_user(&self, user_id: Uuid) -> Result<Option<Wallet>, Error>;

    /// Locks the wallet row, applies the adjustment and persists it.
    /// Fails with `NotFound` when the user has no wallet and `BadRequest`
    /// when the result would be negative.
    async fn adjust(&self, user_id: Uuid, adj: WalletAdjustment) -> Result<Wallet, Error>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_company(&self, company: &Company) -> Result<(), Error>;
    async fn get_company(&self, id: Uuid) -> Result<Option<Company>, Error>;
    async fn list_companies(&self, active_only: bool) -> Result<Vec<Company>, Error>;
    async fn update_company(&self, company: &Company) -> Result<(), Error>;
    async fn delete_company(&self, id: Uuid) -> Result<(), Error>;

    async fn create_token(&self, draft: &TokenDraft) -> Result<Token, Error>;
    async fn get_token(&self, id: Uuid) -> Result<Option<Token>, Error>;
    /// Sorted by price, cheapest first.
    async fn list_tokens(&self, company_id: Option<Uuid>, available_only: bool) -> Result<Vec<Token>, Error>;
    async fn update_token(&self, token: &Token) -> Result<(), Error>;
}

#[async_trait]
pub trait UsageRepository: Send + Sync {
    async fn insert(&self, log: &UsageLog) -> Result<(), Error>;
    /// Totals since `since` (or over all time), split by token type.
    async fn breakdown_since(&self, user_id: Uuid, since: Option<DateTime<Utc>>) -> Result<UsageBreakdown, Error>;
    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid, since: Option<DateTime<Utc>>) -> Result<Vec<UsageLog>, Error>;
    async fn list_all(&self, page: PageRequest) -> Result<(Vec<UsageLog>, i64), Error>;
}

#[async_trait]
pub trait UsageLimitRepository: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<UsageLimit>, Error>;
    /// Inserts `limit` unless the user already has one; returns the stored row.
    async fn get_or_create(&self, limit: &UsageLimit) -> Result<UsageLimit, Error>;
    async fn upsert(&self, limit: &UsageLimit) -> Result<UsageLimit, Error>;
}

#[async_trait]
pub trait CarbonCreditRepository: Send + Sync {
    async fn insert(&self, credit: &CarbonCredit) -> Result<(), Error>;
    /// Newest first. Sold credits are skipped unless `include_sold`.
    async fn list_for_user(&self, user_id: Uuid, include_sold: bool) -> Result<Vec<CarbonCredit>, Error>;
    async fn list_all(&self, page: PageRequest) -> Result<(Vec<CarbonCredit>, i64), Error>;

    /// Marks the credits sold, credits the wallet and journals the sale as
    /// one unit of work. Nothing changes unless every id resolves to an
    /// unsold credit owned by the user.
    async fn settle(&self, settlement: &CreditSettlement) -> Result<(MonetizationQuote, Transaction), Error>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn insert(&self, tx: &Transaction) -> Result<(), Error>;
    async fn get(&self, id: Uuid) -> Result<Option<Transaction>, Error>;
    async fn get_by_reference(&self, reference: &str) -> Result<Option<Transaction>, Error>;
    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid, page: PageRequest) -> Result<(Vec<Transaction>, i64), Error>;
    async fn count_for_company(&self, company_id: Uuid) -> Result<i64, Error>;

    /// Moves a purchase through its state machine and applies the wallet
    /// side effect of the new status in the same unit of work.
    /// `gateway_data` is merged into the transaction metadata.
    async fn settle_purchase(
        &self,
        reference: &str,
        outcome: SettlementOutcome,
        gateway_data: Value,
    ) -> Result<Transaction, Error>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: &Notification) -> Result<(), Error>;
    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid, unread_only: bool, limit: i64) -> Result<Vec<Notification>, Error>;
    /// Returns false when no such notification belongs to the user.
    async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<bool, Error>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn create_session(&self, session: &ChatSession) -> Result<(), Error>;
    async fn get_session(&self, id: Uuid) -> Result<Option<ChatSession>, Error>;
    async fn find_active_session(&self, user_id: Uuid) -> Result<Option<ChatSession>, Error>;
    /// Most recently updated first.
    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<ChatSession>, Error>;
    /// Returns false when no such session belongs to the user.
    async fn end_session(&self, user_id: Uuid, id: Uuid) -> Result<bool, Error>;

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), Error>;
    /// The last `limit` messages of the session, oldest first.
    async fn recent_messages(&self, session_id: Uuid, limit: i64) -> Result<Vec<ChatMessage>, Error>;
}
