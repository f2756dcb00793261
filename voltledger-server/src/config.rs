// voltledger-server/src/config.rs
//
// Command-line and environment settings, turned into an AppConfig once.

use std::time::Duration;

use chrono_tz::Tz;
use clap::Parser;
use rust_decimal::Decimal;

use voltledger_common::models::{CarbonPolicy, UsageLimitDefaults};
use voltledger_core::config::{
    AiSettings, AppConfig, Environment, FirebaseConfig, JwtConfig, PaystackConfig, PushConfig,
    RateLimits,
};
use voltledger_core::Error;

const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Parser, Debug, Clone)]
#[command(name = "voltledger")]
#[command(author, version, about = "VoltLedger - energy token marketplace API")]
pub struct Args {
    /// development, production or test
    #[arg(long, env = "APP_ENV", default_value = "development")]
    pub environment: String,

    /// Address to which the HTTP server will bind
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:5000")]
    pub bind_addr: String,

    /// Postgres connection URL.
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://voltledger@localhost:5432/voltledger")]
    pub database_url: String,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    /// Keep everything in process memory instead of Postgres
    #[arg(long, env = "IN_MEMORY", default_value = "false")]
    pub in_memory: bool,

    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    #[arg(long, env = "JWT_REFRESH_SECRET")]
    pub jwt_refresh_secret: Option<String>,

    #[arg(long, env = "JWT_ACCESS_TTL_MINUTES", default_value_t = 15)]
    pub access_ttl_minutes: i64,

    #[arg(long, env = "JWT_REFRESH_TTL_DAYS", default_value_t = 7)]
    pub refresh_ttl_days: i64,

    /// Enables federated sign-in when set
    #[arg(long, env = "FIREBASE_PROJECT_ID")]
    pub firebase_project_id: Option<String>,

    #[arg(long, env = "FIREBASE_JWKS_URL", default_value = GOOGLE_JWKS_URL)]
    pub firebase_jwks_url: String,

    #[arg(long, env = "PAYSTACK_SECRET_KEY")]
    pub paystack_secret_key: Option<String>,

    #[arg(long, env = "PAYSTACK_BASE_URL", default_value = "https://api.paystack.co")]
    pub paystack_base_url: String,

    #[arg(long, env = "PAYMENT_CALLBACK_URL", default_value = "http://localhost:5000/api/payments/callback")]
    pub payment_callback_url: String,

    #[arg(long, env = "PAYMENT_TIMEOUT_SECS", default_value_t = 30)]
    pub payment_timeout_secs: u64,

    #[arg(long, env = "PAYMENT_MAX_RETRIES", default_value_t = 2)]
    pub payment_max_retries: u32,

    #[arg(long, env = "OPENAI_API_KEY")]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_API_BASE")]
    pub openai_api_base: Option<String>,

    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-3.5-turbo")]
    pub openai_model: String,

    #[arg(long, env = "PUSH_ENDPOINT")]
    pub push_endpoint: Option<String>,

    #[arg(long, env = "PUSH_SERVER_KEY")]
    pub push_server_key: Option<String>,

    #[arg(long, env = "DASHBOARD_URL", default_value = "http://localhost:3000")]
    pub dashboard_url: String,

    /// IANA zone for the daily usage window
    #[arg(long, env = "APP_TIMEZONE", default_value = "Africa/Lagos")]
    pub timezone: String,

    /// kWh of renewable usage per carbon credit
    #[arg(long, env = "CARBON_CREDIT_RATIO", default_value = "10")]
    pub credit_ratio: Decimal,

    #[arg(long, env = "CARBON_CREDIT_PRICE", default_value = "750")]
    pub credit_price: Decimal,

    #[arg(long, env = "CARBON_CONVERSION_KWH_PRICE", default_value = "75")]
    pub conversion_kwh_price: Decimal,

    #[arg(long, env = "DEFAULT_DAILY_LIMIT", default_value = "20")]
    pub daily_limit: Decimal,

    #[arg(long, env = "DEFAULT_WEEKLY_LIMIT", default_value = "120")]
    pub weekly_limit: Decimal,

    #[arg(long, env = "DEFAULT_MONTHLY_LIMIT", default_value = "450")]
    pub monthly_limit: Decimal,

    #[arg(long, env = "DEFAULT_ALERT_THRESHOLD", default_value = "0.8")]
    pub alert_threshold: Decimal,
}

impl Args {
    pub fn to_config(&self) -> Result<AppConfig, Error> {
        let environment: Environment = self.environment.parse()?;
        let dev = AppConfig::development();

        let jwt = match (&self.jwt_secret, &self.jwt_refresh_secret) {
            (Some(access), Some(refresh)) => JwtConfig {
                access_secret: access.clone(),
                refresh_secret: refresh.clone(),
                access_ttl: chrono::Duration::minutes(self.access_ttl_minutes),
                refresh_ttl: chrono::Duration::days(self.refresh_ttl_days),
            },
            _ if environment.is_production() => {
                return Err(Error::Internal(
                    "JWT_SECRET and JWT_REFRESH_SECRET are required in production".into(),
                ));
            }
            _ => JwtConfig {
                access_ttl: chrono::Duration::minutes(self.access_ttl_minutes),
                refresh_ttl: chrono::Duration::days(self.refresh_ttl_days),
                ..dev.jwt
            },
        };

        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|e| Error::Parse(format!("Invalid timezone '{}': {}", self.timezone, e)))?;

        let push = match (&self.push_endpoint, &self.push_server_key) {
            (Some(endpoint), Some(key)) => Some(PushConfig {
                endpoint: endpoint.clone(),
                server_key: key.clone(),
                timeout: Duration::from_secs(10),
            }),
            _ => None,
        };

        Ok(AppConfig {
            environment,
            jwt,
            firebase: self.firebase_project_id.as_ref().map(|project_id| FirebaseConfig {
                project_id: project_id.clone(),
                jwks_url: self.firebase_jwks_url.clone(),
                jwks_ttl: Duration::from_secs(3600),
            }),
            paystack: self.paystack_secret_key.as_ref().map(|key| PaystackConfig {
                secret_key: key.clone(),
                base_url: self.paystack_base_url.clone(),
                callback_url: self.payment_callback_url.clone(),
                timeout: Duration::from_secs(self.payment_timeout_secs),
                max_retries: self.payment_max_retries,
            }),
            ai: self.openai_api_key.as_ref().map(|key| AiSettings {
                api_key: key.clone(),
                api_base: self.openai_api_base.clone(),
                model: self.openai_model.clone(),
            }),
            push,
            carbon: CarbonPolicy {
                credit_ratio: self.credit_ratio,
                credit_price: self.credit_price,
                conversion_kwh_price: self.conversion_kwh_price,
                ..CarbonPolicy::default()
            },
            usage_defaults: UsageLimitDefaults {
                daily_limit: self.daily_limit,
                weekly_limit: self.weekly_limit,
                monthly_limit: self.monthly_limit,
                alert_threshold: self.alert_threshold,
            },
            timezone,
            dashboard_url: self.dashboard_url.clone(),
            rate_limits: RateLimits::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_a_development_config() {
        let args = Args::parse_from(["voltledger"]);
        let config = args.to_config().unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.timezone, chrono_tz::Africa::Lagos);
        assert_eq!(config.carbon, CarbonPolicy::default());
        assert_eq!(config.usage_defaults, UsageLimitDefaults::default());
        assert!(config.paystack.is_none());
    }

    #[test]
    fn production_requires_jwt_secrets() {
        let args = Args::parse_from(["voltledger", "--environment", "production"]);
        assert!(args.to_config().is_err());

        let args = Args::parse_from([
            "voltledger",
            "--environment",
            "production",
            "--jwt-secret",
            "a",
            "--jwt-refresh-secret",
            "b",
        ]);
        assert!(args.to_config().unwrap().environment.is_production());
    }
}
