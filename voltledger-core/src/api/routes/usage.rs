// File: voltledger-core/src/api/routes/usage.rs

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use voltledger_common::models::{PageRequest, UsageLimitUpdate, UsagePeriod};
use crate::api::error::ApiResult;
use crate::api::extract::AuthUser;
use crate::api::response::{created, ok, ok_with};
use crate::api::validate::{Checks, Validate, ValidatedJson};
use crate::api::AppState;
use crate::Error;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageQuery {
    pub period: Option<String>,
    pub all: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUsageBody {
    pub token_id: Uuid,
    pub amount: Decimal,
    pub metadata: Option<Value>,
}

impl Validate for RecordUsageBody {
    fn validate(&self, v: &mut Checks) {
        v.require(self.amount > Decimal::ZERO, "amount", "Amount must be positive");
    }
}

impl Validate for UsageLimitUpdate {
    fn validate(&self, v: &mut Checks) {
        let limits = [
            (self.daily_limit, "dailyLimit"),
            (self.weekly_limit, "weeklyLimit"),
            (self.monthly_limit, "monthlyLimit"),
        ];
        for (value, field) in limits {
            if let Some(x) = value {
                v.require(x > Decimal::ZERO, field, "Limit must be positive");
            }
        }
        if let Some(t) = self.alert_threshold {
            v.require(
                t > Decimal::ZERO && t <= Decimal::ONE,
                "alertThreshold",
                "Threshold must be between 0 and 1",
            );
        }
    }
}

/// Stats for a period, or every user's logs for an admin asking for `all`.
pub async fn usage_stats(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Query(q): Query<UsageQuery>,
) -> ApiResult<impl IntoResponse> {
    if q.all.unwrap_or(false) && who.is_admin() {
        let page = PageRequest::new(q.page, q.limit);
        let logs = state.usage.list_all(page).await?;
        return Ok(ok(serde_json::to_value(logs).map_err(Error::from)?));
    }
    let period = match q.period.as_deref() {
        Some(p) => p
            .parse::<UsagePeriod>()
            .map_err(|_| Error::invalid("period", "Period must be daily, weekly, monthly or all"))?,
        None => UsagePeriod::default(),
    };
    let stats = state.usage.stats(who.user_id, period).await?;
    Ok(ok(serde_json::to_value(stats).map_err(Error::from)?))
}

pub async fn record_usage(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    ValidatedJson(body): ValidatedJson<RecordUsageBody>,
) -> ApiResult<impl IntoResponse> {
    let log = state
        .usage
        .record(who.user_id, body.token_id, body.amount, body.metadata)
        .await?;
    Ok(created(log, "Usage recorded successfully"))
}

pub async fn get_limits(State(state): State<AppState>, AuthUser(who): AuthUser) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.usage.limits(who.user_id).await?))
}

pub async fn update_limits(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    ValidatedJson(body): ValidatedJson<UsageLimitUpdate>,
) -> ApiResult<impl IntoResponse> {
    let limits = state.usage.update_limits(who.user_id, &body).await?;
    Ok(ok_with(limits, "Usage limits updated successfully"))
}
