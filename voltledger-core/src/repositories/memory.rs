// src/repositories/memory.rs
//
// A process-local store implementing every repository trait. Used by the
// `--in-memory` dev mode and by tests. All mutations happen under one lock,
// so each trait method is atomic.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use voltledger_common::models::{
    CarbonCredit, ChatMessage, ChatSession, Company, CreditSettlement, MonetizationQuote,
    Notification, PageRequest, SettlementOutcome, Token, TokenDraft, Transaction, UsageBreakdown,
    UsageLimit, UsageLog, User, Wallet, WalletAdjustment,
};
use voltledger_common::traits::{
    CarbonCreditRepository, CatalogRepository, ChatRepository, NotificationRepository,
    TransactionRepository, UsageLimitRepository, UsageRepository, UserRepository, WalletRepository,
};

use crate::repositories::postgres::carbon::{settlement_adjustment, settlement_transaction};
use crate::repositories::postgres::transaction::{merge_metadata, purchase_adjustment};
use crate::Error;

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    wallets: HashMap<Uuid, Wallet>,
    companies: HashMap<Uuid, Company>,
    tokens: HashMap<Uuid, Token>,
    usage_logs: Vec<UsageLog>,
    usage_limits: HashMap<Uuid, UsageLimit>,
    credits: Vec<CarbonCredit>,
    transactions: Vec<Transaction>,
    notifications: Vec<Notification>,
    sessions: HashMap<Uuid, ChatSession>,
    messages: Vec<ChatMessage>,
}

impl MemoryState {
    fn token_with_company(&self, token: &Token) -> Token {
        let mut t = token.clone();
        if let Some(c) = self.companies.get(&token.company_id) {
            t.company_name = c.name.clone();
        }
        t
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, Error> {
        self.state
            .lock()
            .map_err(|_| Error::Internal("memory store lock poisoned".into()))
    }
}

fn page_of<T: Clone>(items: Vec<T>, page: PageRequest) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let slice = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    (slice, total)
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_with_wallet(&self, user: &User) -> Result<Wallet, Error> {
        let mut s = self.state()?;
        if s.users.values().any(|u| u.email == user.email) {
            return Err(Error::Conflict("A user with this email already exists".into()));
        }
        if let Some(uid) = &user.firebase_uid {
            if s.users.values().any(|u| u.firebase_uid.as_deref() == Some(uid)) {
                return Err(Error::Conflict("A user with this federated id already exists".into()));
            }
        }
        let wallet = Wallet::new(user.id);
        s.users.insert(user.id, user.clone());
        s.wallets.insert(user.id, wallet.clone());
        Ok(wallet)
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, Error> {
        Ok(self.state()?.users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let email = email.to_lowercase();
        Ok(self.state()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_by_firebase_uid(&self, uid: &str) -> Result<Option<User>, Error> {
        Ok(self
            .state()?
            .users
            .values()
            .find(|u| u.firebase_uid.as_deref() == Some(uid))
            .cloned())
    }

    async fn update(&self, user: &User) -> Result<(), Error> {
        let mut s = self.state()?;
        match s.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("User {} not found", user.id))),
        }
    }

    async fn list(&self, page: PageRequest) -> Result<(Vec<User>, i64), Error> {
        let s = self.state()?;
        let mut users: Vec<User> = s.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page_of(users, page))
    }
}

#[async_trait]
impl WalletRepository for MemoryStore {
    async fn get_by_user(&self, user_id: Uuid) -> Result<Option<Wallet>, Error> {
        Ok(self.state()?.wallets.get(&user_id).cloned())
    }

    async fn adjust(&self, user_id: Uuid, adj: WalletAdjustment) -> Result<Wallet, Error> {
        let mut s = self.state()?;
        let wallet = s
            .wallets
            .get_mut(&user_id)
            .ok_or_else(|| Error::NotFound("Wallet not found".into()))?;
        wallet.apply(adj)?;
        Ok(wallet.clone())
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn create_company(&self, company: &Company) -> Result<(), Error> {
        let mut s = self.state()?;
        if s.companies.values().any(|c| c.slug == company.slug) {
            return Err(Error::Conflict("A company with this slug already exists".into()));
        }
        s.companies.insert(company.id, company.clone());
        Ok(())
    }

    async fn get_company(&self, id: Uuid) -> Result<Option<Company>, Error> {
        Ok(self.state()?.companies.get(&id).cloned())
    }

    async fn list_companies(&self, active_only: bool) -> Result<Vec<Company>, Error> {
        let s = self.state()?;
        let mut out: Vec<Company> = s
            .companies
            .values()
            .filter(|c| !active_only || c.is_active)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn update_company(&self, company: &Company) -> Result<(), Error> {
        let mut s = self.state()?;
        if s.companies.values().any(|c| c.slug == company.slug && c.id != company.id) {
            return Err(Error::Conflict("A company with this slug already exists".into()));
        }
        match s.companies.get_mut(&company.id) {
            Some(existing) => {
                *existing = company.clone();
                Ok(())
            }
            None => Err(Error::NotFound("Company not found".into())),
        }
    }

    async fn delete_company(&self, id: Uuid) -> Result<(), Error> {
        let mut s = self.state()?;
        if s.companies.remove(&id).is_none() {
            return Err(Error::NotFound("Company not found".into()));
        }
        s.tokens.retain(|_, t| t.company_id != id);
        Ok(())
    }

    async fn create_token(&self, draft: &TokenDraft) -> Result<Token, Error> {
        let mut s = self.state()?;
        let company_name = match s.companies.get(&draft.company_id) {
            Some(c) => c.name.clone(),
            None => return Err(Error::BadRequest("Referenced company does not exist".into())),
        };
        let now = Utc::now();
        let token = Token {
            id: Uuid::new_v4(),
            company_id: draft.company_id,
            company_name,
            token_type: draft.token_type,
            price_per_unit: draft.price_per_unit,
            is_available: draft.is_available.unwrap_or(true),
            description: draft.description.clone(),
            created_at: now,
            updated_at: now,
        };
        s.tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn get_token(&self, id: Uuid) -> Result<Option<Token>, Error> {
        let s = self.state()?;
        Ok(s.tokens.get(&id).map(|t| s.token_with_company(t)))
    }

    async fn list_tokens(&self, company_id: Option<Uuid>, available_only: bool) -> Result<Vec<Token>, Error> {
        let s = self.state()?;
        let mut out: Vec<Token> = s
            .tokens
            .values()
            .filter(|t| company_id.is_none_or(|c| t.company_id == c))
            .filter(|t| {
                !available_only
                    || (t.is_available
                        && s.companies.get(&t.company_id).is_some_and(|c| c.is_active))
            })
            .map(|t| s.token_with_company(t))
            .collect();
        out.sort_by(|a, b| a.price_per_unit.cmp(&b.price_per_unit));
        Ok(out)
    }

    async fn update_token(&self, token: &Token) -> Result<(), Error> {
        let mut s = self.state()?;
        match s.tokens.get_mut(&token.id) {
            Some(existing) => {
                *existing = token.clone();
                Ok(())
            }
            None => Err(Error::NotFound("Token not found".into())),
        }
    }
}

#[async_trait]
impl UsageRepository for MemoryStore {
    async fn insert(&self, log: &UsageLog) -> Result<(), Error> {
        let mut s = self.state()?;
        if !s.tokens.contains_key(&log.token_id) {
            return Err(Error::BadRequest("Referenced token does not exist".into()));
        }
        s.usage_logs.push(log.clone());
        Ok(())
    }

    async fn breakdown_since(&self, user_id: Uuid, since: Option<DateTime<Utc>>) -> Result<UsageBreakdown, Error> {
        let s = self.state()?;
        let mut out = UsageBreakdown::default();
        for log in s
            .usage_logs
            .iter()
            .filter(|l| l.user_id == user_id && since.is_none_or(|t| l.timestamp >= t))
        {
            out.total += log.amount;
            let renewable = s
                .tokens
                .get(&log.token_id)
                .is_some_and(|t| t.token_type.is_renewable());
            if renewable {
                out.renewable += log.amount;
            } else {
                out.non_renewable += log.amount;
            }
        }
        Ok(out)
    }

    async fn list_for_user(&self, user_id: Uuid, since: Option<DateTime<Utc>>) -> Result<Vec<UsageLog>, Error> {
        let s = self.state()?;
        let mut logs: Vec<UsageLog> = s
            .usage_logs
            .iter()
            .rev()
            .filter(|l| l.user_id == user_id && since.is_none_or(|t| l.timestamp >= t))
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(logs)
    }

    async fn list_all(&self, page: PageRequest) -> Result<(Vec<UsageLog>, i64), Error> {
        let s = self.state()?;
        let mut logs: Vec<UsageLog> = s.usage_logs.iter().rev().cloned().collect();
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(page_of(logs, page))
    }
}

#[async_trait]
impl UsageLimitRepository for MemoryStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<UsageLimit>, Error> {
        Ok(self.state()?.usage_limits.get(&user_id).cloned())
    }

    async fn get_or_create(&self, limit: &UsageLimit) -> Result<UsageLimit, Error> {
        let mut s = self.state()?;
        Ok(s.usage_limits
            .entry(limit.user_id)
            .or_insert_with(|| limit.clone())
            .clone())
    }

    async fn upsert(&self, limit: &UsageLimit) -> Result<UsageLimit, Error> {
        let mut s = self.state()?;
        let stored = s
            .usage_limits
            .entry(limit.user_id)
            .and_modify(|existing| {
                existing.daily_limit = limit.daily_limit;
                existing.weekly_limit = limit.weekly_limit;
                existing.monthly_limit = limit.monthly_limit;
                existing.alert_threshold = limit.alert_threshold;
                existing.updated_at = limit.updated_at;
            })
            .or_insert_with(|| limit.clone());
        Ok(stored.clone())
    }
}

#[async_trait]
impl CarbonCreditRepository for MemoryStore {
    async fn insert(&self, credit: &CarbonCredit) -> Result<(), Error> {
        self.state()?.credits.push(credit.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid, include_sold: bool) -> Result<Vec<CarbonCredit>, Error> {
        let s = self.state()?;
        Ok(s.credits
            .iter()
            .rev()
            .filter(|c| c.user_id == user_id && (include_sold || !c.is_sold))
            .cloned()
            .collect())
    }

    async fn list_all(&self, page: PageRequest) -> Result<(Vec<CarbonCredit>, i64), Error> {
        let s = self.state()?;
        Ok(page_of(s.credits.iter().rev().cloned().collect(), page))
    }

    async fn settle(&self, settlement: &CreditSettlement) -> Result<(MonetizationQuote, Transaction), Error> {
        let mut s = self.state()?;

        let matched: Vec<usize> = s
            .credits
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                settlement.credit_ids.contains(&c.id) && c.user_id == settlement.user_id && !c.is_sold
            })
            .map(|(i, _)| i)
            .collect();
        if matched.len() != settlement.credit_ids.len() {
            return Err(Error::BadRequest(
                "Some carbon credits are invalid or already sold".into(),
            ));
        }
        if s.transactions.iter().any(|t| t.reference == settlement.reference) {
            return Err(Error::Conflict("Transaction reference already exists".into()));
        }

        let total_credits: Decimal = matched.iter().map(|&i| s.credits[i].amount).sum();
        let quote = settlement.policy.quote(total_credits, settlement.action);

        // Stage the wallet change first; nothing is written if it fails.
        let mut wallet = s
            .wallets
            .get(&settlement.user_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Wallet not found".into()))?;
        wallet.apply(settlement_adjustment(settlement.action, &quote))?;

        let now = Utc::now();
        for &i in &matched {
            let c = &mut s.credits[i];
            c.is_sold = true;
            c.sold_at = Some(now);
            c.sold_price = Some(settlement.policy.credit_price);
        }
        s.wallets.insert(settlement.user_id, wallet);
        let journal = settlement_transaction(settlement, &quote);
        s.transactions.push(journal.clone());
        Ok((quote, journal))
    }
}

#[async_trait]
impl TransactionRepository for MemoryStore {
    async fn insert(&self, tx: &Transaction) -> Result<(), Error> {
        let mut s = self.state()?;
        if s.transactions.iter().any(|t| t.reference == tx.reference) {
            return Err(Error::Conflict("Transaction reference already exists".into()));
        }
        s.transactions.push(tx.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Transaction>, Error> {
        Ok(self.state()?.transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn get_by_reference(&self, reference: &str) -> Result<Option<Transaction>, Error> {
        Ok(self
            .state()?
            .transactions
            .iter()
            .find(|t| t.reference == reference)
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid, page: PageRequest) -> Result<(Vec<Transaction>, i64), Error> {
        let s = self.state()?;
        let txs = s
            .transactions
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        Ok(page_of(txs, page))
    }

    async fn count_for_company(&self, company_id: Uuid) -> Result<i64, Error> {
        let s = self.state()?;
        Ok(s.transactions
            .iter()
            .filter(|t| t.company_id == Some(company_id))
            .count() as i64)
    }

    async fn settle_purchase(
        &self,
        reference: &str,
        outcome: SettlementOutcome,
        gateway_data: Value,
    ) -> Result<Transaction, Error> {
        let mut s = self.state()?;
        let idx = s
            .transactions
            .iter()
            .position(|t| t.reference == reference)
            .ok_or_else(|| Error::NotFound("Transaction not found".into()))?;

        let mut tx = s.transactions[idx].clone();
        let next = tx.status.transition(outcome)?;
        tx.status = next;
        tx.updated_at = Utc::now();
        merge_metadata(&mut tx.metadata, gateway_data);

        if let Some(adj) = purchase_adjustment(&tx, next) {
            let wallet = s
                .wallets
                .get_mut(&tx.user_id)
                .ok_or_else(|| Error::NotFound("Wallet not found".into()))?;
            wallet.apply(adj)?;
        }
        s.transactions[idx] = tx.clone();
        Ok(tx)
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn insert(&self, notification: &Notification) -> Result<(), Error> {
        self.state()?.notifications.push(notification.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid, unread_only: bool, limit: i64) -> Result<Vec<Notification>, Error> {
        let s = self.state()?;
        Ok(s.notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<bool, Error> {
        let mut s = self.state()?;
        match s.notifications.iter_mut().find(|n| n.id == id && n.user_id == user_id) {
            Some(n) => {
                n.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ChatRepository for MemoryStore {
    async fn create_session(&self, session: &ChatSession) -> Result<(), Error> {
        self.state()?.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<ChatSession>, Error> {
        Ok(self.state()?.sessions.get(&id).cloned())
    }

    async fn find_active_session(&self, user_id: Uuid) -> Result<Option<ChatSession>, Error> {
        let s = self.state()?;
        Ok(s.sessions
            .values()
            .filter(|c| c.user_id == user_id && c.is_active)
            .max_by_key(|c| c.updated_at)
            .cloned())
    }

    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<ChatSession>, Error> {
        let s = self.state()?;
        let mut out: Vec<ChatSession> = s.sessions.values().filter(|c| c.user_id == user_id).cloned().collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(out)
    }

    async fn end_session(&self, user_id: Uuid, id: Uuid) -> Result<bool, Error> {
        let mut s = self.state()?;
        match s.sessions.get_mut(&id) {
            Some(session) if session.user_id == user_id => {
                session.is_active = false;
                session.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), Error> {
        let mut s = self.state()?;
        match s.sessions.get_mut(&message.session_id) {
            Some(session) => session.updated_at = message.created_at,
            None => return Err(Error::BadRequest("Referenced chat session does not exist".into())),
        }
        s.messages.push(message.clone());
        Ok(())
    }

    async fn recent_messages(&self, session_id: Uuid, limit: i64) -> Result<Vec<ChatMessage>, Error> {
        let s = self.state()?;
        let mut recent: Vec<ChatMessage> = s
            .messages
            .iter()
            .rev()
            .filter(|m| m.session_id == session_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        recent.reverse();
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use voltledger_common::models::{CarbonPolicy, MonetizeAction};

    async fn user_with_wallet(store: &MemoryStore) -> Uuid {
        let user = User::new("ada@example.com", "Ada", "Obi");
        store.create_with_wallet(&user).await.unwrap();
        user.id
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() -> Result<(), Error> {
        let store = MemoryStore::new();
        user_with_wallet(&store).await;
        let again = User::new("ADA@example.com", "Ada", "Obi");
        let err = store.create_with_wallet(&again).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        Ok(())
    }

    #[tokio::test]
    async fn failed_settlement_leaves_credits_unsold() -> Result<(), Error> {
        let store = MemoryStore::new();
        let user_id = user_with_wallet(&store).await;
        let credit = CarbonCredit::new(user_id, dec!(2), "Lumos", dec!(20));
        CarbonCreditRepository::insert(&store, &credit).await?;

        let settlement = CreditSettlement {
            user_id,
            credit_ids: vec![credit.id, Uuid::new_v4()],
            action: MonetizeAction::SellToCash,
            reference: "CARBON-1-abc".into(),
            policy: CarbonPolicy::default(),
        };
        assert!(matches!(store.settle(&settlement).await, Err(Error::BadRequest(_))));

        let open = CarbonCreditRepository::list_for_user(&store, user_id, false).await?;
        assert_eq!(open.len(), 1);
        let wallet = store.get_by_user(user_id).await?.unwrap();
        assert_eq!(wallet.cash_balance, Decimal::ZERO);
        Ok(())
    }

    #[tokio::test]
    async fn recent_messages_are_oldest_first() -> Result<(), Error> {
        let store = MemoryStore::new();
        let user_id = user_with_wallet(&store).await;
        let session = ChatSession::new(user_id, Default::default());
        store.create_session(&session).await?;
        for i in 0..5 {
            store
                .insert_message(&ChatMessage::new(session.id, voltledger_common::models::ChatRole::User, &format!("m{i}")))
                .await?;
        }
        let recent = store.recent_messages(session.id, 3).await?;
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
        Ok(())
    }
}
