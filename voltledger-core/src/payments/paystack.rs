// File: voltledger-core/src/payments/paystack.rs
//
// Paystack REST client. Amounts cross the wire in kobo.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, warn};

use voltledger_common::models::{PaymentInit, PaymentRequest, PaymentStatus, PaymentVerification};
use voltledger_common::traits::PaymentGateway;
use crate::config::PaystackConfig;
use crate::crypto::verify_payload_signature;
use crate::Error;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

pub fn to_kobo(amount: Decimal) -> Result<i64, Error> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| Error::BadRequest("Amount out of range".into()))
}

pub fn from_kobo(kobo: i64) -> Decimal {
    Decimal::new(kobo, 2)
}

pub struct PaystackGateway {
    config: PaystackConfig,
    client: Client,
}

impl PaystackGateway {
    pub fn new(config: PaystackConfig) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Sends the request, retrying transport failures and 5xx answers.
    /// Callers only pass requests that are safe to repeat.
    async fn send_json(&self, build: impl Fn() -> RequestBuilder) -> Result<Value, Error> {
        let mut attempt = 0u32;
        loop {
            let result = build().bearer_auth(&self.config.secret_key).send().await;
            let retryable = match &result {
                Ok(resp) => resp.status().is_server_error(),
                Err(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            };
            if retryable && attempt < self.config.max_retries {
                attempt += 1;
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                warn!("gateway call failed, retry {} in {:?}", attempt, delay);
                tokio::time::sleep(delay).await;
                continue;
            }

            let resp = result?;
            let status = resp.status();
            let body: Value = resp.json().await?;
            if !status.is_success() || body["status"].as_bool() != Some(true) {
                let message = body["message"].as_str().unwrap_or("gateway error").to_string();
                return Err(match status {
                    StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => Error::BadRequest(message),
                    _ => Error::ServiceUnavailable(message),
                });
            }
            return Ok(body);
        }
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initialize(&self, request: &PaymentRequest) -> Result<PaymentInit, Error> {
        let payload = json!({
            "email": request.email,
            "amount": to_kobo(request.amount)?,
            "reference": request.reference,
            "callback_url": request.callback_url,
            "metadata": request.metadata,
        });
        let body = self
            .send_json(|| self.client.post(self.url("/transaction/initialize")).json(&payload))
            .await?;
        debug!("initialized payment {}", request.reference);

        let data = &body["data"];
        let field = |name: &str| {
            data[name]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::ServiceUnavailable(format!("gateway response missing {}", name)))
        };
        Ok(PaymentInit {
            authorization_url: field("authorization_url")?,
            access_code: field("access_code")?,
            reference: field("reference")?,
        })
    }

    async fn verify(&self, reference: &str) -> Result<PaymentVerification, Error> {
        let path = format!("/transaction/verify/{}", urlencode(reference));
        let body = self.send_json(|| self.client.get(self.url(&path))).await?;
        let data = &body["data"];

        Ok(PaymentVerification {
            reference: data["reference"].as_str().unwrap_or(reference).to_string(),
            status: PaymentStatus::from_gateway(data["status"].as_str().unwrap_or("failed")),
            amount: from_kobo(data["amount"].as_i64().unwrap_or(0)),
            currency: data["currency"].as_str().unwrap_or("NGN").to_string(),
            gateway_id: data["id"].as_i64().map(|id| id.to_string()),
            metadata: data["metadata"].clone(),
        })
    }

    fn verify_signature(&self, body: &[u8], signature: &str) -> bool {
        verify_payload_signature(&self.config.secret_key, body, signature)
    }
}

fn urlencode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sign_payload;
    use rust_decimal_macros::dec;

    fn gateway() -> PaystackGateway {
        PaystackGateway::new(PaystackConfig {
            secret_key: "sk_test_abc".into(),
            base_url: "https://api.paystack.co/".into(),
            callback_url: "http://localhost/api/payments/callback".into(),
            timeout: Duration::from_secs(5),
            max_retries: 2,
        })
        .unwrap()
    }

    #[test]
    fn kobo_conversion() {
        assert_eq!(to_kobo(dec!(1500.50)).unwrap(), 150050);
        assert_eq!(to_kobo(dec!(0.015)).unwrap(), 2);
        assert_eq!(from_kobo(150050), dec!(1500.50));
    }

    #[test]
    fn joins_paths_without_double_slash() {
        assert_eq!(
            gateway().url("/transaction/initialize"),
            "https://api.paystack.co/transaction/initialize"
        );
    }

    #[test]
    fn webhook_signature_uses_secret_key() {
        let g = gateway();
        let body = br#"{"event":"charge.success","data":{"reference":"TXN-1"}}"#;
        let sig = sign_payload("sk_test_abc", body).unwrap();
        assert!(g.verify_signature(body, &sig));
        assert!(!g.verify_signature(body, &sign_payload("other", body).unwrap()));
    }
}
