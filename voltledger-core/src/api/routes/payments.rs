// File: voltledger-core/src/api/routes/payments.rs

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use voltledger_common::models::PaymentMethod;
use crate::api::error::ApiResult;
use crate::api::extract::AuthUser;
use crate::api::response::{ok, ok_with};
use crate::api::routes::auth::PageQuery;
use crate::api::validate::{Checks, Validate, ValidatedJson};
use crate::api::AppState;
use crate::services::{CallbackResult, PurchaseOrder};

pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseBody {
    pub token_id: Uuid,
    pub quantity: Decimal,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
}

impl Validate for PurchaseBody {
    fn validate(&self, v: &mut Checks) {
        v.require(self.quantity > Decimal::ZERO, "quantity", "Quantity must be positive")
            .require(self.amount > Decimal::ZERO, "amount", "Amount must be positive");
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub reference: Option<String>,
    pub trxref: Option<String>,
}

pub async fn purchase(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    ValidatedJson(body): ValidatedJson<PurchaseBody>,
) -> ApiResult<impl IntoResponse> {
    let receipt = state
        .purchases
        .purchase(
            &who,
            PurchaseOrder {
                token_id: body.token_id,
                quantity: body.quantity,
                amount: body.amount,
                payment_method: body.payment_method,
            },
        )
        .await?;
    Ok(ok_with(receipt, "Purchase initiated successfully"))
}

/// Where the gateway sends the browser after checkout.
pub async fn callback(State(state): State<AppState>, Query(q): Query<CallbackQuery>) -> ApiResult<Redirect> {
    let reference = q.reference.or(q.trxref);
    let result = state.purchases.handle_callback(reference.as_deref()).await;
    let target = match state.purchases.redirect_url(result) {
        Ok(url) => url,
        Err(_) => state.purchases.redirect_url(CallbackResult::Error)?,
    };
    Ok(Redirect::to(&target))
}

pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    state.purchases.handle_webhook(&body, signature).await?;
    Ok(ok(json!({ "received": true })))
}

pub async fn transactions(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Query(q): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.purchases.history(who.user_id, q.page()).await?))
}

pub async fn wallet(State(state): State<AppState>, AuthUser(who): AuthUser) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.wallets.get(who.user_id).await?))
}
