// File: voltledger-common/src/traits/gateway_traits.rs
//
// Seams to the outside world: credential schemes, the payment processor,
// the chat model and device push.

use async_trait::async_trait;
use serde_json::Value;
use crate::error::Error;
use crate::models::{ChatMessage, Identity, Language, PaymentInit, PaymentRequest, PaymentVerification};

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Short name used in logs.
    fn scheme(&self) -> &'static str;

    /// `Error::Auth` means "not mine or not valid", and lets the next scheme try.
    /// Any other error stops the chain.
    async fn verify(&self, bearer: &str) -> Result<Identity, Error>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(&self, request: &PaymentRequest) -> Result<PaymentInit, Error>;
    async fn verify(&self, reference: &str) -> Result<PaymentVerification, Error>;
    /// Checks a webhook signature against the raw request body.
    fn verify_signature(&self, body: &[u8], signature: &str) -> bool;
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// `history` is oldest first and excludes `message`.
    async fn complete(&self, message: &str, history: &[ChatMessage], language: Language) -> Result<String, Error>;
    async fn translate(&self, text: &str, target: Language) -> Result<String, Error>;
}

#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, device_token: &str, title: &str, body: &str, data: &Value) -> Result<(), Error>;
}
