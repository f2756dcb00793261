// File: voltledger-core/src/config.rs
//
// Runtime configuration. Built once by the binary and handed down; nothing
// below this module reads the environment.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use voltledger_common::models::{CarbonPolicy, UsageLimitDefaults};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
            Environment::Test => write!(f, "test"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: chrono::Duration,
    pub refresh_ttl: chrono::Duration,
}

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub jwks_url: String,
    pub jwks_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct PaystackConfig {
    pub secret_key: String,
    pub base_url: String,
    pub callback_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct AiSettings {
    pub api_key: String,
    pub api_base: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct PushConfig {
    pub endpoint: String,
    pub server_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitRule {
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self { max_requests, window: Duration::from_secs(window_secs) }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    pub general: RateLimitRule,
    pub auth: RateLimitRule,
    pub payment: RateLimitRule,
    pub chat: RateLimitRule,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            general: RateLimitRule::new(100, 15 * 60),
            auth: RateLimitRule::new(5, 15 * 60),
            payment: RateLimitRule::new(10, 60),
            chat: RateLimitRule::new(30, 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub jwt: JwtConfig,
    /// Federated sign-in is disabled when unset.
    pub firebase: Option<FirebaseConfig>,
    /// Purchases are refused with 503 when unset.
    pub paystack: Option<PaystackConfig>,
    pub ai: Option<AiSettings>,
    pub push: Option<PushConfig>,
    pub carbon: CarbonPolicy,
    pub usage_defaults: UsageLimitDefaults,
    /// Zone used for the "since midnight" usage window.
    pub timezone: Tz,
    pub dashboard_url: String,
    pub rate_limits: RateLimits,
}

impl AppConfig {
    /// Local defaults with throwaway secrets. Never used in production.
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            jwt: JwtConfig {
                access_secret: "dev-access-secret-change-me".to_string(),
                refresh_secret: "dev-refresh-secret-change-me".to_string(),
                access_ttl: chrono::Duration::minutes(15),
                refresh_ttl: chrono::Duration::days(7),
            },
            firebase: None,
            paystack: None,
            ai: None,
            push: None,
            carbon: CarbonPolicy::default(),
            usage_defaults: UsageLimitDefaults::default(),
            timezone: chrono_tz::Africa::Lagos,
            dashboard_url: "http://localhost:3000".to_string(),
            rate_limits: RateLimits::default(),
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.jwt.access_ttl.num_seconds()
    }
}
