pub mod carbon_service;
pub mod catalog_service;
pub mod chat_service;
pub mod notification_service;
pub mod purchase_service;
pub mod usage_service;
pub mod user_service;
pub mod wallet_service;

pub use carbon_service::{CarbonService, CreditPortfolio};
pub use catalog_service::CatalogService;
pub use chat_service::{ChatReply, ChatService, Translation};
pub use notification_service::NotificationService;
pub use purchase_service::{CallbackResult, PurchaseOrder, PurchaseReceipt, PurchaseService};
pub use usage_service::UsageService;
pub use user_service::{LoginOutcome, RefreshedAccess, Registration, UserService};
pub use wallet_service::WalletService;
