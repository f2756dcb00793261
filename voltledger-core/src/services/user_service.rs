// File: voltledger-core/src/services/user_service.rs

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use voltledger_common::models::{
    Identity, Language, Page, PageRequest, ProfileUpdate, User, Wallet,
};
use voltledger_common::traits::{UserRepository, WalletRepository};
use crate::auth::{JwtManager, TokenPair};
use crate::crypto::{hash_password, verify_password};
use crate::Error;

/// Input for a new password account. Assumed already validated.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub language: Option<Language>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub user: User,
    pub wallet: Option<Wallet>,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedAccess {
    pub access_token: String,
    pub expires_in: i64,
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    wallets: Arc<dyn WalletRepository>,
    jwt: Arc<JwtManager>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        wallets: Arc<dyn WalletRepository>,
        jwt: Arc<JwtManager>,
    ) -> Self {
        Self { users, wallets, jwt }
    }

    pub async fn register(&self, reg: Registration) -> Result<User, Error> {
        let email = reg.email.trim().to_lowercase();
        if self.users.get_by_email(&email).await?.is_some() {
            return Err(Error::Conflict("User with this email already exists".into()));
        }

        let mut user = User::new(&email, &reg.first_name, &reg.last_name);
        user.phone = reg.phone;
        user.language = reg.language.unwrap_or_default();
        user.password_hash = Some(hash_password(&reg.password)?);

        self.users.create_with_wallet(&user).await?;
        info!("Registered user {} ({})", user.id, user.email);
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, Error> {
        let invalid = || Error::Auth("Invalid email or password".into());

        let user = self
            .users
            .get_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(invalid)?;
        let Some(hash) = user.password_hash.as_deref() else {
            debug!("password login attempted on federated-only account {}", user.id);
            return Err(invalid());
        };
        if !verify_password(password, hash)? {
            return Err(invalid());
        }
        if !user.is_active {
            return Err(Error::Forbidden("Account is disabled".into()));
        }

        let tokens = self.jwt.issue_pair(&Identity::from(&user))?;
        let wallet = self.wallets.get_by_user(user.id).await?;
        Ok(LoginOutcome { user, wallet, tokens })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedAccess, Error> {
        let claims = self.jwt.decode_refresh(refresh_token)?;
        let user = self
            .users
            .get(claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| Error::Auth("Invalid refresh token".into()))?;
        Ok(RefreshedAccess {
            access_token: self.jwt.issue_access(&Identity::from(&user))?,
            expires_in: self.jwt.access_ttl_secs(),
        })
    }

    /// Revokes a self-issued access token. Federated tokens are not ours to revoke.
    pub fn logout(&self, bearer: &str) -> Result<(), Error> {
        match self.jwt.revoke(bearer) {
            Ok(()) | Err(Error::Auth(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<User, Error> {
        self.users
            .get(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))
    }

    pub async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<User, Error> {
        let mut user = self.profile(user_id).await?;
        update.apply_to(&mut user);
        self.users.update(&user).await?;
        Ok(user)
    }

    pub async fn register_push_token(&self, user_id: Uuid, token: &str) -> Result<(), Error> {
        let mut user = self.profile(user_id).await?;
        user.push_token = Some(token.to_string());
        user.updated_at = chrono::Utc::now();
        self.users.update(&user).await
    }

    pub async fn list_users(&self, page: PageRequest) -> Result<Page<User>, Error> {
        let (items, total) = self.users.list(page).await?;
        Ok(Page::new(items, page, total))
    }
}
