// File: voltledger-core/src/services/carbon_service.rs

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use voltledger_common::models::{
    CarbonCredit, CarbonCreditStats, CarbonPolicy, CreditSettlement, MonetizationResult,
    MonetizeAction, Page, PageRequest,
};
use voltledger_common::traits::CarbonCreditRepository;
use crate::crypto::generate_reference;
use crate::Error;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreditPortfolio {
    pub credits: Vec<CarbonCredit>,
    /// Always computed over every credit the user has ever earned.
    pub stats: CarbonCreditStats,
}

pub struct CarbonService {
    credits: Arc<dyn CarbonCreditRepository>,
    policy: CarbonPolicy,
}

impl CarbonService {
    pub fn new(credits: Arc<dyn CarbonCreditRepository>, policy: CarbonPolicy) -> Self {
        Self { credits, policy }
    }

    pub fn policy(&self) -> &CarbonPolicy {
        &self.policy
    }

    pub async fn portfolio(&self, user_id: Uuid, include_sold: bool) -> Result<CreditPortfolio, Error> {
        let all = self.credits.list_for_user(user_id, true).await?;
        let stats = CarbonCreditStats::from_credits(&all);
        let credits = if include_sold {
            all
        } else {
            all.into_iter().filter(|c| !c.is_sold).collect()
        };
        Ok(CreditPortfolio { credits, stats })
    }

    /// Every user's credits, newest first. Admin only at the route.
    pub async fn list_all(&self, page: PageRequest) -> Result<Page<CarbonCredit>, Error> {
        let (items, total) = self.credits.list_all(page).await?;
        Ok(Page::new(items, page, total))
    }

    /// Sells or converts the given credits. All-or-nothing.
    pub async fn monetize(
        &self,
        user_id: Uuid,
        credit_ids: Vec<Uuid>,
        action: MonetizeAction,
    ) -> Result<MonetizationResult, Error> {
        if credit_ids.is_empty() {
            return Err(Error::invalid("creditIds", "At least one credit is required"));
        }

        let settlement = CreditSettlement {
            user_id,
            credit_ids,
            action,
            reference: generate_reference("CARBON"),
            policy: self.policy,
        };
        let (quote, tx) = self.credits.settle(&settlement).await?;
        info!(
            "{} monetized {} credit(s) via {} for {} (ref {})",
            user_id, quote.total_credits, action, quote.total_amount, tx.reference
        );

        Ok(MonetizationResult {
            credits_monetized: quote.total_credits,
            amount: quote.total_amount,
            tokens_received: quote.kwh_granted,
            action: action.outcome_label().to_string(),
            reference: tx.reference,
        })
    }
}
