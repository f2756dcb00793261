// File: voltledger-core/src/api/routes/carbon.rs

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use uuid::Uuid;

use voltledger_common::models::{MonetizeAction, PageRequest};
use crate::api::error::ApiResult;
use crate::api::extract::AuthUser;
use crate::api::response::{ok, ok_with};
use crate::api::validate::{Checks, Validate, ValidatedJson};
use crate::api::AppState;
use crate::Error;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsQuery {
    pub include_used: Option<bool>,
    pub all: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonetizeBody {
    pub credit_ids: Vec<Uuid>,
    pub action: String,
}

impl Validate for MonetizeBody {
    fn validate(&self, v: &mut Checks) {
        v.require(!self.credit_ids.is_empty(), "creditIds", "At least one credit is required");
    }
}

/// The caller's credits and stats, or every user's credits for an admin asking for `all`.
pub async fn list_credits(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Query(q): Query<CreditsQuery>,
) -> ApiResult<impl IntoResponse> {
    if q.all.unwrap_or(false) && who.is_admin() {
        let credits = state.carbon.list_all(PageRequest::new(q.page, q.limit)).await?;
        return Ok(ok(serde_json::to_value(credits).map_err(Error::from)?));
    }
    let portfolio = state
        .carbon
        .portfolio(who.user_id, q.include_used.unwrap_or(false))
        .await?;
    Ok(ok(serde_json::to_value(portfolio).map_err(Error::from)?))
}

pub async fn monetize(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    ValidatedJson(body): ValidatedJson<MonetizeBody>,
) -> ApiResult<impl IntoResponse> {
    let action: MonetizeAction = body
        .action
        .parse()
        .map_err(|_| Error::BadRequest("Invalid action specified".into()))?;
    let result = state.carbon.monetize(who.user_id, body.credit_ids, action).await?;
    Ok(ok_with(result, "Carbon credits processed successfully"))
}
