// File: voltledger-core/src/test_utils/fixtures.rs
//
// Seed data for service and API tests running on the in-memory store.

use std::sync::Arc;

use rust_decimal::Decimal;
use voltledger_common::models::{Company, CompanyDraft, Role, Token, TokenDraft, TokenType, User};
use voltledger_common::traits::CatalogRepository;

use crate::api::{AppState, Collaborators};
use crate::config::{AppConfig, Environment};
use crate::crypto::hash_password;
use crate::eventbus::EventBus;
use crate::repositories::{MemoryStore, Repositories};
use crate::Error;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub struct Seeded {
    pub store: Arc<MemoryStore>,
    pub repos: Repositories,
    pub customer: User,
    pub admin: User,
    pub company: Company,
    pub renewable: Token,
    pub grid: Token,
}

/// A config with the test environment flag and fixed secrets.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.environment = Environment::Test;
    config
}

pub async fn seed_user(repos: &Repositories, email: &str, role: Role) -> Result<User, Error> {
    let mut user = User::new(email, "Ada", "Okafor");
    user.role = role;
    user.password_hash = Some(hash_password(TEST_PASSWORD)?);
    repos.users.create_with_wallet(&user).await?;
    Ok(user)
}

pub async fn seed_token(
    catalog: &dyn CatalogRepository,
    company: &Company,
    token_type: TokenType,
    price: Decimal,
) -> Result<Token, Error> {
    catalog
        .create_token(&TokenDraft {
            company_id: company.id,
            token_type,
            price_per_unit: price,
            is_available: Some(true),
            description: None,
        })
        .await
}

/// One customer, one admin, one company selling a renewable and a grid token.
pub async fn seed() -> Result<Seeded, Error> {
    let store = Arc::new(MemoryStore::new());
    let repos = Repositories::from_store(store.clone());

    let customer = seed_user(&repos, "customer@example.com", Role::Customer).await?;
    let admin = seed_user(&repos, "admin@example.com", Role::Admin).await?;

    let company = CompanyDraft {
        name: "Sunrise Power".to_string(),
        slug: "sunrise-power".to_string(),
        ..Default::default()
    }
    .into_company();
    repos.catalog.create_company(&company).await?;

    let renewable = seed_token(repos.catalog.as_ref(), &company, TokenType::Renewable, Decimal::new(75, 0)).await?;
    let grid = seed_token(repos.catalog.as_ref(), &company, TokenType::NonRenewable, Decimal::new(60, 0)).await?;

    Ok(Seeded { store, repos, customer, admin, company, renewable, grid })
}

/// Application state over seeded memory repositories.
pub fn app_state(seeded: &Seeded, collaborators: Collaborators) -> AppState {
    AppState::new(test_config(), &seeded.repos, Arc::new(EventBus::new()), collaborators)
}
