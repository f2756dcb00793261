// File: voltledger-core/src/api/state.rs

use std::sync::Arc;

use tracing::info;

use voltledger_common::traits::{ChatBackend, CredentialVerifier, PaymentGateway};
use crate::api::rate_limit::RateLimiter;
use crate::auth::{CompositeVerifier, FirebaseVerifier, JwtManager, TokenDenylist};
use crate::config::AppConfig;
use crate::db::Database;
use crate::eventbus::EventBus;
use crate::repositories::Repositories;
use crate::services::{
    CarbonService, CatalogService, ChatService, NotificationService, PurchaseService,
    UsageService, UserService, WalletService,
};

/// Outside services the API talks to. Any of them may be absent.
#[derive(Default, Clone)]
pub struct Collaborators {
    pub payment_gateway: Option<Arc<dyn PaymentGateway>>,
    pub chat_backend: Option<Arc<dyn ChatBackend>>,
    /// Only used by the health check; in-memory mode has none.
    pub database: Option<Database>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: Arc<JwtManager>,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub limiter: Arc<RateLimiter>,
    pub events: Arc<EventBus>,
    pub users: Arc<UserService>,
    pub wallets: Arc<WalletService>,
    pub usage: Arc<UsageService>,
    pub carbon: Arc<CarbonService>,
    pub catalog: Arc<CatalogService>,
    pub purchases: Arc<PurchaseService>,
    pub notifications: Arc<NotificationService>,
    pub chat: Arc<ChatService>,
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        repos: &Repositories,
        events: Arc<EventBus>,
        collaborators: Collaborators,
    ) -> Self {
        let jwt = Arc::new(JwtManager::new(config.jwt.clone(), Arc::new(TokenDenylist::new())));

        let mut verifiers: Vec<Arc<dyn CredentialVerifier>> = vec![jwt.clone()];
        if let Some(fb) = &config.firebase {
            info!("Federated sign-in enabled for project {}", fb.project_id);
            verifiers.push(Arc::new(FirebaseVerifier::new(fb.clone(), repos.users.clone())));
        }
        let verifier: Arc<dyn CredentialVerifier> = Arc::new(CompositeVerifier::new(verifiers));

        let notifications = Arc::new(NotificationService::new(
            repos.notifications.clone(),
            events.clone(),
        ));
        let usage = Arc::new(UsageService::new(
            repos.usage.clone(),
            repos.usage_limits.clone(),
            repos.catalog.clone(),
            repos.credits.clone(),
            notifications.clone(),
            events.clone(),
            config.carbon,
            config.usage_defaults,
            config.timezone,
        ));
        let callback_url = config
            .paystack
            .as_ref()
            .map(|p| p.callback_url.clone())
            .unwrap_or_default();
        let purchases = Arc::new(PurchaseService::new(
            repos.catalog.clone(),
            repos.transactions.clone(),
            collaborators.payment_gateway,
            events.clone(),
            callback_url,
            config.dashboard_url.clone(),
        ));

        Self {
            users: Arc::new(UserService::new(repos.users.clone(), repos.wallets.clone(), jwt.clone())),
            wallets: Arc::new(WalletService::new(repos.wallets.clone())),
            carbon: Arc::new(CarbonService::new(repos.credits.clone(), config.carbon)),
            catalog: Arc::new(CatalogService::new(repos.catalog.clone(), repos.transactions.clone())),
            chat: Arc::new(ChatService::new(
                repos.chat.clone(),
                repos.users.clone(),
                collaborators.chat_backend,
            )),
            usage,
            purchases,
            notifications,
            verifier,
            jwt,
            limiter: Arc::new(RateLimiter::new()),
            events,
            database: collaborators.database,
            config: Arc::new(config),
        }
    }
}
