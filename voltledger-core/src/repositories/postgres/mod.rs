// src/repositories/postgres/mod.rs

pub mod carbon;
pub mod catalog;
pub mod chat;
pub mod notification;
pub mod transaction;
pub mod usage;
pub mod user;
pub mod wallet;

pub use carbon::PostgresCarbonCreditRepository;
pub use catalog::PostgresCatalogRepository;
pub use chat::PostgresChatRepository;
pub use notification::PostgresNotificationRepository;
pub use transaction::PostgresTransactionRepository;
pub use usage::{PostgresUsageLimitRepository, PostgresUsageRepository};
pub use user::PostgresUserRepository;
pub use wallet::PostgresWalletRepository;
