// File: voltledger-core/src/auth/mod.rs

pub mod firebase;
pub mod jwt;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use voltledger_common::models::{Identity, Role};
use voltledger_common::traits::CredentialVerifier;
use crate::Error;

pub use firebase::FirebaseVerifier;
pub use jwt::{AccessClaims, JwtManager, RefreshClaims, TokenDenylist, TokenPair};

/// Tries each scheme in order. A scheme answering `Error::Auth` hands over
/// to the next one; any other error ends the chain.
pub struct CompositeVerifier {
    verifiers: Vec<Arc<dyn CredentialVerifier>>,
}

impl CompositeVerifier {
    pub fn new(verifiers: Vec<Arc<dyn CredentialVerifier>>) -> Self {
        Self { verifiers }
    }
}

#[async_trait]
impl CredentialVerifier for CompositeVerifier {
    fn scheme(&self) -> &'static str {
        "composite"
    }

    async fn verify(&self, bearer: &str) -> Result<Identity, Error> {
        for v in &self.verifiers {
            match v.verify(bearer).await {
                Ok(identity) => return Ok(identity),
                Err(Error::Auth(reason)) => {
                    debug!("scheme '{}' declined token: {}", v.scheme(), reason);
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::Auth("Invalid or expired token".into()))
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, Error> {
    let value = header.ok_or_else(|| Error::Auth("Access token required".into()))?;
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(Error::Auth("Access token required".into())),
    }
}

pub fn require_role(identity: &Identity, allowed: &[Role]) -> Result<(), Error> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(Error::Forbidden("Insufficient permissions".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use uuid::Uuid;

    mock! {
        pub Verifier {}

        #[async_trait]
        impl CredentialVerifier for Verifier {
            fn scheme(&self) -> &'static str;
            async fn verify(&self, bearer: &str) -> Result<Identity, Error>;
        }
    }

    fn identity() -> Identity {
        Identity { user_id: Uuid::new_v4(), email: "x@y.ng".into(), role: Role::Customer }
    }

    #[tokio::test]
    async fn falls_back_to_second_scheme() -> Result<(), Error> {
        let expected = identity();
        let returned = expected.clone();

        let mut first = MockVerifier::new();
        first.expect_scheme().return_const("first");
        first.expect_verify().returning(|_| Err(Error::Auth("nope".into())));
        let mut second = MockVerifier::new();
        second.expect_verify().returning(move |_| Ok(returned.clone()));

        let composite = CompositeVerifier::new(vec![Arc::new(first), Arc::new(second)]);
        assert_eq!(composite.verify("tok").await?, expected);
        Ok(())
    }

    #[tokio::test]
    async fn non_auth_error_stops_the_chain() {
        let mut first = MockVerifier::new();
        first.expect_verify().returning(|_| Err(Error::NotFound("User not found".into())));
        let mut second = MockVerifier::new();
        second.expect_verify().never();

        let composite = CompositeVerifier::new(vec![Arc::new(first), Arc::new(second)]);
        assert!(matches!(composite.verify("tok").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn all_declined_is_unauthorized() {
        let mut only = MockVerifier::new();
        only.expect_scheme().return_const("only");
        only.expect_verify().returning(|_| Err(Error::Auth("bad".into())));
        let composite = CompositeVerifier::new(vec![Arc::new(only)]);
        assert!(matches!(composite.verify("tok").await, Err(Error::Auth(_))));
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(Some("bearer   abc ")).unwrap(), "abc");
        assert!(bearer_token(Some("Basic abc")).is_err());
        assert!(bearer_token(Some("Bearer ")).is_err());
        assert!(bearer_token(None).is_err());
    }

    #[test]
    fn role_gate() {
        let mut id = identity();
        assert!(matches!(require_role(&id, &[Role::Admin]), Err(Error::Forbidden(_))));
        id.role = Role::Admin;
        assert!(require_role(&id, &[Role::Admin]).is_ok());
    }
}
