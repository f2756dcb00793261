// File: voltledger-core/src/auth/jwt.rs
//
// Self-issued HS256 access/refresh tokens plus an in-process revocation list.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use voltledger_common::models::{Identity, Role};
use voltledger_common::traits::CredentialVerifier;
use crate::config::JwtConfig;
use crate::Error;

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub jti: String,
    pub typ: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub jti: String,
    pub typ: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Revoked token ids, kept until the token would have expired anyway.
#[derive(Default)]
pub struct TokenDenylist {
    revoked: DashMap<String, i64>,
}

impl TokenDenylist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(&self, jti: &str, exp: i64) {
        self.revoked.insert(jti.to_string(), exp);
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.contains_key(jti)
    }

    /// Drops entries whose tokens have expired. Returns how many were removed.
    pub fn purge_expired(&self, now_ts: i64) -> usize {
        let mut removed = 0;
        self.revoked.retain(|_, exp| {
            let keep = *exp > now_ts;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }
}

pub struct JwtManager {
    config: JwtConfig,
    denylist: Arc<TokenDenylist>,
}

impl JwtManager {
    pub fn new(config: JwtConfig, denylist: Arc<TokenDenylist>) -> Self {
        Self { config, denylist }
    }

    pub fn denylist(&self) -> Arc<TokenDenylist> {
        self.denylist.clone()
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.config.access_ttl.num_seconds()
    }

    pub fn issue_access(&self, identity: &Identity) -> Result<String, Error> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: identity.user_id,
            email: identity.email.clone(),
            role: identity.role,
            jti: Uuid::new_v4().to_string(),
            typ: ACCESS.to_string(),
            iat: now.timestamp(),
            exp: (now + self.config.access_ttl).timestamp(),
        };
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.access_secret.as_bytes()),
        )?)
    }

    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, Error> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user_id,
            jti: Uuid::new_v4().to_string(),
            typ: REFRESH.to_string(),
            iat: now.timestamp(),
            exp: (now + self.config.refresh_ttl).timestamp(),
        };
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.refresh_secret.as_bytes()),
        )?)
    }

    pub fn issue_pair(&self, identity: &Identity) -> Result<TokenPair, Error> {
        Ok(TokenPair {
            access_token: self.issue_access(identity)?,
            refresh_token: self.issue_refresh(identity.user_id)?,
            expires_in: self.access_ttl_secs(),
        })
    }

    pub fn decode_access(&self, token: &str) -> Result<AccessClaims, Error> {
        let data = decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.config.access_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;
        let claims = data.claims;
        if claims.typ != ACCESS {
            return Err(Error::Auth("not an access token".into()));
        }
        if self.denylist.is_revoked(&claims.jti) {
            return Err(Error::Auth("token has been revoked".into()));
        }
        Ok(claims)
    }

    pub fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, Error> {
        let data = decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.config.refresh_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| Error::Auth("Invalid refresh token".into()))?;
        if data.claims.typ != REFRESH || self.denylist.is_revoked(&data.claims.jti) {
            return Err(Error::Auth("Invalid refresh token".into()));
        }
        Ok(data.claims)
    }

    /// Revokes the access token; later verification of it fails.
    pub fn revoke(&self, token: &str) -> Result<(), Error> {
        let claims = self.decode_access(token)?;
        self.denylist.revoke(&claims.jti, claims.exp);
        debug!("revoked access token {} for {}", claims.jti, claims.sub);
        Ok(())
    }
}

#[async_trait]
impl CredentialVerifier for JwtManager {
    fn scheme(&self) -> &'static str {
        "jwt"
    }

    async fn verify(&self, bearer: &str) -> Result<Identity, Error> {
        let claims = self.decode_access(bearer)?;
        Ok(Identity {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new(
            JwtConfig {
                access_secret: "a-secret".into(),
                refresh_secret: "r-secret".into(),
                access_ttl: chrono::Duration::minutes(15),
                refresh_ttl: chrono::Duration::days(7),
            },
            Arc::new(TokenDenylist::new()),
        )
    }

    fn identity() -> Identity {
        Identity { user_id: Uuid::new_v4(), email: "a@b.ng".into(), role: Role::Customer }
    }

    #[tokio::test]
    async fn access_token_verifies_to_identity() -> Result<(), Error> {
        let m = manager();
        let id = identity();
        let pair = m.issue_pair(&id)?;
        assert_eq!(pair.expires_in, 900);
        assert_eq!(m.verify(&pair.access_token).await?, id);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let m = manager();
        let pair = m.issue_pair(&identity()).unwrap();
        assert!(matches!(m.verify(&pair.refresh_token).await, Err(Error::Auth(_))));
        assert!(m.decode_refresh(&pair.access_token).is_err());
        assert!(m.decode_refresh(&pair.refresh_token).is_ok());
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let m = manager();
        let token = m.issue_access(&identity()).unwrap();
        m.revoke(&token).unwrap();
        assert!(matches!(m.verify(&token).await, Err(Error::Auth(_))));
    }

    #[test]
    fn purge_drops_only_expired_entries() {
        let list = TokenDenylist::new();
        list.revoke("old", 100);
        list.revoke("fresh", 10_000);
        assert_eq!(list.purge_expired(500), 1);
        assert!(list.is_revoked("fresh"));
        assert!(!list.is_revoked("old"));
    }

    #[test]
    fn purge_counts_stay_exact_under_concurrent_revokes() {
        let list = Arc::new(TokenDenylist::new());
        let writers: Vec<_> = (0..4)
            .map(|t| {
                let list = list.clone();
                std::thread::spawn(move || {
                    for i in 0..2_000 {
                        list.revoke(&format!("live-{}-{}", t, i), i64::MAX);
                        list.revoke(&format!("dead-{}-{}", t, i), 0);
                    }
                })
            })
            .collect();

        let mut removed = 0;
        while writers.iter().any(|w| !w.is_finished()) {
            removed += list.purge_expired(1);
        }
        for w in writers {
            w.join().unwrap();
        }
        removed += list.purge_expired(1);

        assert_eq!(removed, 8_000);
        assert_eq!(list.len(), 8_000);
    }
}
