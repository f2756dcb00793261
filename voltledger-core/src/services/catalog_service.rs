// File: voltledger-core/src/services/catalog_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use voltledger_common::models::{Company, CompanyDraft, Token, TokenDraft, TokenUpdate};
use voltledger_common::traits::{CatalogRepository, TransactionRepository};
use crate::Error;

pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
    transactions: Arc<dyn TransactionRepository>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, transactions: Arc<dyn TransactionRepository>) -> Self {
        Self { catalog, transactions }
    }

    pub async fn list_companies(&self) -> Result<Vec<Company>, Error> {
        self.catalog.list_companies(true).await
    }

    pub async fn company(&self, id: Uuid) -> Result<Company, Error> {
        self.catalog
            .get_company(id)
            .await?
            .ok_or_else(|| Error::NotFound("Company not found".into()))
    }

    pub async fn create_company(&self, draft: CompanyDraft) -> Result<Company, Error> {
        let company = draft.into_company();
        self.catalog.create_company(&company).await?;
        info!("Created company '{}' ({})", company.name, company.slug);
        Ok(company)
    }

    /// Companies with journalled transactions cannot be removed.
    pub async fn delete_company(&self, id: Uuid) -> Result<(), Error> {
        self.company(id).await?;
        if self.transactions.count_for_company(id).await? > 0 {
            return Err(Error::BadRequest(
                "Cannot delete company with existing transactions".into(),
            ));
        }
        self.catalog.delete_company(id).await
    }

    pub async fn list_tokens(&self, company_id: Option<Uuid>) -> Result<Vec<Token>, Error> {
        self.catalog.list_tokens(company_id, true).await
    }

    pub async fn create_token(&self, draft: &TokenDraft) -> Result<Token, Error> {
        if draft.price_per_unit <= Decimal::ZERO {
            return Err(Error::invalid("pricePerUnit", "Price must be positive"));
        }
        self.company(draft.company_id).await?;
        self.catalog.create_token(draft).await
    }

    pub async fn update_token(&self, id: Uuid, update: &TokenUpdate) -> Result<Token, Error> {
        if update.price_per_unit.is_some_and(|p| p <= Decimal::ZERO) {
            return Err(Error::invalid("pricePerUnit", "Price must be positive"));
        }
        let mut token = self
            .catalog
            .get_token(id)
            .await?
            .ok_or_else(|| Error::NotFound("Token not found".into()))?;
        update.apply_to(&mut token);
        self.catalog.update_token(&token).await?;
        Ok(token)
    }
}
