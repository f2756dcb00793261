// File: voltledger-core/src/api/routes/catalog.rs
//
// Companies and the tokens they sell. Reads are public, writes are admin-only.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use voltledger_common::models::{CompanyDraft, TokenDraft, TokenUpdate};
use crate::api::error::ApiResult;
use crate::api::extract::AdminUser;
use crate::api::response::{created, ok, ok_with};
use crate::api::validate::{Checks, Validate, ValidatedJson, SLUG_RE};
use crate::api::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokensQuery {
    pub company_id: Option<Uuid>,
}

impl Validate for CompanyDraft {
    fn validate(&self, v: &mut Checks) {
        v.min_len(&self.name, 2, "name").require(
            SLUG_RE.is_match(&self.slug),
            "slug",
            "Slug may only contain lowercase letters, numbers and hyphens",
        );
        if let Some(logo) = &self.logo {
            v.url(logo, "logo");
        }
        if let Some(email) = &self.support_email {
            v.email(email, "supportEmail");
        }
    }
}

impl Validate for TokenDraft {
    fn validate(&self, v: &mut Checks) {
        v.require(self.price_per_unit > Decimal::ZERO, "pricePerUnit", "Price must be positive");
    }
}

impl Validate for TokenUpdate {
    fn validate(&self, v: &mut Checks) {
        if let Some(p) = self.price_per_unit {
            v.require(p > Decimal::ZERO, "pricePerUnit", "Price must be positive");
        }
    }
}

pub async fn list_companies(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.catalog.list_companies().await?))
}

pub async fn get_company(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.catalog.company(id).await?))
}

pub async fn create_company(
    State(state): State<AppState>,
    _admin: AdminUser,
    ValidatedJson(body): ValidatedJson<CompanyDraft>,
) -> ApiResult<impl IntoResponse> {
    Ok(created(state.catalog.create_company(body).await?, "Company created successfully"))
}

pub async fn delete_company(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.catalog.delete_company(id).await?;
    Ok(ok_with(json!({}), "Company deleted successfully"))
}

pub async fn list_tokens(
    State(state): State<AppState>,
    Query(q): Query<TokensQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.catalog.list_tokens(q.company_id).await?))
}

pub async fn create_token(
    State(state): State<AppState>,
    _admin: AdminUser,
    ValidatedJson(body): ValidatedJson<TokenDraft>,
) -> ApiResult<impl IntoResponse> {
    Ok(created(state.catalog.create_token(&body).await?, "Token created successfully"))
}

pub async fn update_token(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<TokenUpdate>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok_with(state.catalog.update_token(id, &body).await?, "Token updated successfully"))
}
