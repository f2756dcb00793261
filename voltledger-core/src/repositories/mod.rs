// src/repositories/mod.rs

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use voltledger_common::traits::{
    CarbonCreditRepository, CatalogRepository, ChatRepository, NotificationRepository,
    TransactionRepository, UsageLimitRepository, UsageRepository, UserRepository, WalletRepository,
};

use crate::db::Database;
pub use memory::MemoryStore;

/// Every repository the services need, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub wallets: Arc<dyn WalletRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub usage: Arc<dyn UsageRepository>,
    pub usage_limits: Arc<dyn UsageLimitRepository>,
    pub credits: Arc<dyn CarbonCreditRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub chat: Arc<dyn ChatRepository>,
}

impl Repositories {
    pub fn postgres(db: &Database) -> Self {
        let pool = db.pool().clone();
        Self {
            users: Arc::new(postgres::PostgresUserRepository::new(pool.clone())),
            wallets: Arc::new(postgres::PostgresWalletRepository::new(pool.clone())),
            catalog: Arc::new(postgres::PostgresCatalogRepository::new(pool.clone())),
            usage: Arc::new(postgres::PostgresUsageRepository::new(pool.clone())),
            usage_limits: Arc::new(postgres::PostgresUsageLimitRepository::new(pool.clone())),
            credits: Arc::new(postgres::PostgresCarbonCreditRepository::new(pool.clone())),
            transactions: Arc::new(postgres::PostgresTransactionRepository::new(pool.clone())),
            notifications: Arc::new(postgres::PostgresNotificationRepository::new(pool.clone())),
            chat: Arc::new(postgres::PostgresChatRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }

    pub fn from_store(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            wallets: store.clone(),
            catalog: store.clone(),
            usage: store.clone(),
            usage_limits: store.clone(),
            credits: store.clone(),
            transactions: store.clone(),
            notifications: store.clone(),
            chat: store,
        }
    }
}
