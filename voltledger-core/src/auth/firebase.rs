// File: voltledger-core/src/auth/firebase.rs
//
// Verifies Firebase ID tokens (RS256) against Google's published keys and
// resolves them to a local user by uid.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use voltledger_common::models::Identity;
use voltledger_common::traits::{CredentialVerifier, UserRepository};
use crate::config::FirebaseConfig;
use crate::Error;

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

struct CachedKeys {
    fetched_at: Instant,
    keys: JwkSet,
}

pub struct FirebaseVerifier {
    config: FirebaseConfig,
    client: reqwest::Client,
    users: Arc<dyn UserRepository>,
    cache: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(config: FirebaseConfig, users: Arc<dyn UserRepository>) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            users,
            cache: RwLock::new(None),
        }
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.config.project_id)
    }

    async fn fetch_keys(&self) -> Result<JwkSet, Error> {
        let keys = self
            .client
            .get(&self.config.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await?;
        info!("Fetched {} federated signing key(s)", keys.keys.len());
        Ok(keys)
    }

    /// Returns the cached key set, refreshing it when stale or when `kid` is unknown.
    async fn keys_for(&self, kid: &str) -> Result<JwkSet, Error> {
        {
            let cache = self.cache.read().await;
            if let Some(c) = cache.as_ref() {
                if c.fetched_at.elapsed() < self.config.jwks_ttl && c.keys.find(kid).is_some() {
                    return Ok(c.keys.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;
        match self.fetch_keys().await {
            Ok(keys) => {
                *cache = Some(CachedKeys { fetched_at: Instant::now(), keys: keys.clone() });
                Ok(keys)
            }
            Err(e) => match cache.as_ref() {
                Some(c) => {
                    warn!("Key refresh failed, using cached set: {:?}", e);
                    Ok(c.keys.clone())
                }
                None => Err(Error::ServiceUnavailable(format!("federated keys unavailable: {}", e))),
            },
        }
    }
}

#[async_trait]
impl CredentialVerifier for FirebaseVerifier {
    fn scheme(&self) -> &'static str {
        "firebase"
    }

    async fn verify(&self, bearer: &str) -> Result<Identity, Error> {
        let header = decode_header(bearer)?;
        if header.alg != Algorithm::RS256 {
            return Err(Error::Auth("unexpected signing algorithm".into()));
        }
        let kid = header
            .kid
            .ok_or_else(|| Error::Auth("token has no key id".into()))?;

        let keys = self.keys_for(&kid).await?;
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| Error::Auth("unknown signing key".into()))?;
        let key = DecodingKey::from_jwk(jwk)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.config.project_id.as_str()]);
        validation.set_issuer(&[self.issuer()]);
        let claims = decode::<FirebaseClaims>(bearer, &key, &validation)?.claims;
        debug!("federated token ok for uid={} email={:?}", claims.sub, claims.email);

        let user = self
            .users
            .get_by_firebase_uid(&claims.sub)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))?;
        if !user.is_active {
            return Err(Error::Forbidden("Account is disabled".into()));
        }
        Ok(Identity::from(&user))
    }
}
