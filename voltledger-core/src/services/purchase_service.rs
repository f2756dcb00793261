// File: voltledger-core/src/services/purchase_service.rs
//
// Token purchases: a PENDING journal entry is written before the gateway is
// contacted, and its reference is the gateway's idempotency key. Settlement
// (callback or webhook) moves it to SUCCESS or FAILED exactly once.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use voltledger_common::models::{
    Identity, Page, PageRequest, PaymentMethod, PaymentRequest, PaymentStatus, SettlementOutcome,
    Transaction, TransactionStatus, TransactionType,
};
use voltledger_common::traits::{CatalogRepository, PaymentGateway, TransactionRepository};
use crate::crypto::generate_reference;
use crate::eventbus::{EventBus, LedgerEvent};
use crate::Error;

/// Largest tolerated gap between the quoted amount and price x quantity.
pub const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Debug, Clone)]
pub struct PurchaseOrder {
    pub token_id: Uuid,
    pub quantity: Decimal,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub transaction: Transaction,
    pub payment_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackResult {
    Success,
    Failed,
    Error,
}

impl CallbackResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackResult::Success => "success",
            CallbackResult::Failed => "failed",
            CallbackResult::Error => "error",
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    event: String,
    #[serde(default)]
    data: Value,
}

pub struct PurchaseService {
    catalog: Arc<dyn CatalogRepository>,
    transactions: Arc<dyn TransactionRepository>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    events: Arc<EventBus>,
    callback_url: String,
    dashboard_url: String,
}

impl PurchaseService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        transactions: Arc<dyn TransactionRepository>,
        gateway: Option<Arc<dyn PaymentGateway>>,
        events: Arc<EventBus>,
        callback_url: String,
        dashboard_url: String,
    ) -> Self {
        Self { catalog, transactions, gateway, events, callback_url, dashboard_url }
    }

    fn gateway(&self) -> Result<&Arc<dyn PaymentGateway>, Error> {
        self.gateway
            .as_ref()
            .ok_or_else(|| Error::ServiceUnavailable("Payment service is not configured".into()))
    }

    pub async fn purchase(&self, buyer: &Identity, order: PurchaseOrder) -> Result<PurchaseReceipt, Error> {
        let gateway = self.gateway()?;
        if order.quantity <= Decimal::ZERO {
            return Err(Error::invalid("quantity", "Quantity must be positive"));
        }
        if order.amount <= Decimal::ZERO {
            return Err(Error::invalid("amount", "Amount must be positive"));
        }

        let token = self
            .catalog
            .get_token(order.token_id)
            .await?
            .ok_or_else(|| Error::NotFound("Token not found".into()))?;
        if !token.is_available {
            return Err(Error::BadRequest("Token is not available for purchase".into()));
        }
        let expected = token.price_per_unit * order.quantity;
        if (order.amount - expected).abs() > AMOUNT_TOLERANCE {
            return Err(Error::BadRequest("Invalid purchase amount".into()));
        }

        let mut tx = Transaction::new(
            buyer.user_id,
            TransactionType::Purchase,
            TransactionStatus::Pending,
            order.amount,
            generate_reference("TXN"),
        );
        tx.quantity = Some(order.quantity);
        tx.payment_method = Some(order.payment_method);
        tx.company_id = Some(token.company_id);
        tx.token_id = Some(token.id);
        tx.metadata = json!({
            "tokenType": token.token_type,
            "pricePerUnit": token.price_per_unit,
            "companyName": token.company_name,
        });
        self.transactions.insert(&tx).await?;

        let request = PaymentRequest {
            email: buyer.email.clone(),
            amount: order.amount,
            reference: tx.reference.clone(),
            callback_url: self.callback_url.clone(),
            metadata: json!({
                "transactionId": tx.id,
                "userId": buyer.user_id,
                "tokenId": token.id,
                "quantity": order.quantity,
            }),
        };
        let init = match gateway.initialize(&request).await {
            Ok(init) => init,
            Err(e) => {
                warn!("payment init failed for {}: {:?}", tx.reference, e);
                let reason = json!({ "initError": e.to_string() });
                if let Err(settle_err) = self
                    .transactions
                    .settle_purchase(&tx.reference, SettlementOutcome::Failed, reason)
                    .await
                {
                    warn!("could not fail {}: {:?}", tx.reference, settle_err);
                }
                return Err(e);
            }
        };
        info!("Purchase {} opened for {} ({} kWh)", tx.reference, buyer.user_id, order.quantity);

        Ok(PurchaseReceipt {
            reference: tx.reference.clone(),
            transaction: tx,
            payment_url: init.authorization_url,
            access_code: init.access_code,
        })
    }

    /// Asks the gateway for the payment outcome and settles the purchase.
    /// Already-settled purchases are returned untouched.
    pub async fn confirm(&self, reference: &str) -> Result<Transaction, Error> {
        let gateway = self.gateway()?;
        let tx = self
            .transactions
            .get_by_reference(reference)
            .await?
            .ok_or_else(|| Error::NotFound("Transaction not found".into()))?;
        if tx.tx_type != TransactionType::Purchase {
            return Err(Error::BadRequest("Not a purchase transaction".into()));
        }
        if tx.status != TransactionStatus::Pending {
            debug!("{} already settled as {}", reference, tx.status);
            return Ok(tx);
        }

        let verification = gateway.verify(reference).await?;
        let outcome = match verification.status {
            PaymentStatus::Pending => return Ok(tx),
            PaymentStatus::Success if verification.amount + AMOUNT_TOLERANCE < tx.amount => {
                warn!(
                    "{} paid {} but {} was due",
                    reference, verification.amount, tx.amount
                );
                SettlementOutcome::Failed
            }
            PaymentStatus::Success => SettlementOutcome::Success,
            PaymentStatus::Failed | PaymentStatus::Abandoned => SettlementOutcome::Failed,
        };
        let gateway_data = json!({
            "gateway": {
                "status": verification.status,
                "amount": verification.amount,
                "currency": verification.currency,
                "gatewayId": verification.gateway_id,
            }
        });

        let settled = match self
            .transactions
            .settle_purchase(reference, outcome, gateway_data)
            .await
        {
            Ok(t) => t,
            // A concurrent callback/webhook won the race.
            Err(Error::BadRequest(_)) => {
                return self
                    .transactions
                    .get_by_reference(reference)
                    .await?
                    .ok_or_else(|| Error::NotFound("Transaction not found".into()));
            }
            Err(e) => return Err(e),
        };
        info!("Purchase {} settled as {}", reference, settled.status);
        self.events
            .publish(LedgerEvent::PurchaseSettled(settled.clone()))
            .await;
        Ok(settled)
    }

    pub async fn handle_callback(&self, reference: Option<&str>) -> CallbackResult {
        let Some(reference) = reference.filter(|r| !r.is_empty()) else {
            return CallbackResult::Error;
        };
        match self.confirm(reference).await {
            Ok(tx) if tx.status == TransactionStatus::Success => CallbackResult::Success,
            Ok(_) => CallbackResult::Failed,
            Err(e) => {
                warn!("payment callback for {} failed: {:?}", reference, e);
                CallbackResult::Error
            }
        }
    }

    /// Dashboard URL the browser is sent back to after checkout.
    pub fn redirect_url(&self, result: CallbackResult) -> Result<String, Error> {
        let mut url = Url::parse(&self.dashboard_url)
            .and_then(|base| base.join("dashboard"))
            .map_err(|e| Error::Internal(format!("bad dashboard url: {}", e)))?;
        url.query_pairs_mut().append_pair("payment", result.as_str());
        Ok(url.to_string())
    }

    /// Handles a signed gateway event. Only `charge.success` is acted on.
    pub async fn handle_webhook(&self, body: &[u8], signature: Option<&str>) -> Result<(), Error> {
        let gateway = self.gateway()?;
        let signature = signature.ok_or_else(|| Error::Auth("Missing signature".into()))?;
        if !gateway.verify_signature(body, signature) {
            return Err(Error::Auth("Invalid signature".into()));
        }

        let event: WebhookEvent = serde_json::from_slice(body)?;
        if event.event != "charge.success" {
            debug!("ignoring gateway event '{}'", event.event);
            return Ok(());
        }
        let reference = event
            .data
            .get("reference")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::BadRequest("Webhook payload has no reference".into()))?;
        self.confirm(reference).await.map(|_| ())
    }

    pub async fn history(&self, user_id: Uuid, page: PageRequest) -> Result<Page<Transaction>, Error> {
        let (items, total) = self.transactions.list_for_user(user_id, page).await?;
        Ok(Page::new(items, page, total))
    }
}
