// File: voltledger-core/src/services/usage_service.rs
//
// Recording usage drives two follow-ups in order: carbon credit accrual for
// renewable tokens, then the limit check. Only the first can fail the call.

use std::sync::Arc;

use chrono::{DateTime, Duration, Months, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use voltledger_common::models::{
    CarbonCredit, CarbonPolicy, Notification, NotificationType, Page, PageRequest, UsageLimit,
    UsageLimitDefaults, UsageLimitUpdate, UsageLog, UsagePeriod, UsageStats,
};
use voltledger_common::traits::{
    CarbonCreditRepository, CatalogRepository, UsageLimitRepository, UsageRepository,
};
use crate::eventbus::{EventBus, LedgerEvent};
use crate::services::notification_service::NotificationService;
use crate::Error;

/// Decimal places stored for kWh amounts.
pub const KWH_SCALE: u32 = 4;

/// Start of the window `period` covers at `now`. `None` means all time.
pub fn window_start(period: UsagePeriod, now: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    match period {
        UsagePeriod::Daily => {
            let midnight = now.with_timezone(&tz).date_naive().and_hms_opt(0, 0, 0)?;
            let local = tz
                .from_local_datetime(&midnight)
                .earliest()
                .map(|d| d.with_timezone(&Utc));
            Some(local.unwrap_or(now - Duration::days(1)))
        }
        UsagePeriod::Weekly => Some(now - Duration::days(7)),
        UsagePeriod::Monthly => Some(
            now.checked_sub_months(Months::new(1))
                .unwrap_or(now - Duration::days(30)),
        ),
        UsagePeriod::All => None,
    }
}

fn capitalized(period: UsagePeriod) -> String {
    let s = period.to_string();
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => s,
    }
}

pub struct UsageService {
    usage: Arc<dyn UsageRepository>,
    limits: Arc<dyn UsageLimitRepository>,
    catalog: Arc<dyn CatalogRepository>,
    credits: Arc<dyn CarbonCreditRepository>,
    notifications: Arc<NotificationService>,
    events: Arc<EventBus>,
    policy: CarbonPolicy,
    defaults: UsageLimitDefaults,
    timezone: Tz,
}

impl UsageService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        usage: Arc<dyn UsageRepository>,
        limits: Arc<dyn UsageLimitRepository>,
        catalog: Arc<dyn CatalogRepository>,
        credits: Arc<dyn CarbonCreditRepository>,
        notifications: Arc<NotificationService>,
        events: Arc<EventBus>,
        policy: CarbonPolicy,
        defaults: UsageLimitDefaults,
        timezone: Tz,
    ) -> Self {
        Self {
            usage,
            limits,
            catalog,
            credits,
            notifications,
            events,
            policy,
            defaults,
            timezone,
        }
    }

    pub async fn record(
        &self,
        user_id: Uuid,
        token_id: Uuid,
        amount: Decimal,
        metadata: Option<Value>,
    ) -> Result<UsageLog, Error> {
        if amount <= Decimal::ZERO {
            return Err(Error::invalid("amount", "Amount must be positive"));
        }
        if amount.normalize().scale() > KWH_SCALE {
            return Err(Error::invalid("amount", "Amount supports at most 4 decimal places"));
        }
        let token = self
            .catalog
            .get_token(token_id)
            .await?
            .ok_or_else(|| Error::NotFound("Token not found".into()))?;

        let log = UsageLog {
            id: Uuid::new_v4(),
            user_id,
            token_id,
            amount,
            timestamp: Utc::now(),
            metadata: metadata.unwrap_or_else(|| json!({})),
        };
        self.usage.insert(&log).await?;
        debug!("usage {} kWh by {} on token {}", amount, user_id, token_id);

        if token.token_type.is_renewable() {
            self.accrue_credits(user_id, amount, &token.company_name).await?;
        }

        if let Err(e) = self.evaluate_limits(user_id).await {
            warn!("usage limit check failed for {}: {:?}", user_id, e);
        }
        Ok(log)
    }

    async fn accrue_credits(
        &self,
        user_id: Uuid,
        renewable_kwh: Decimal,
        source: &str,
    ) -> Result<Option<CarbonCredit>, Error> {
        let accrual = self.policy.accrue(renewable_kwh);
        if accrual.credits_earned <= Decimal::ZERO {
            return Ok(None);
        }
        let credit = CarbonCredit::new(user_id, accrual.credits_earned, source, renewable_kwh);
        self.credits.insert(&credit).await?;
        info!(
            "{} earned {} carbon credit(s), {} kg CO2 avoided",
            user_id, accrual.credits_earned, accrual.co2_reduction
        );
        self.events
            .publish(LedgerEvent::CreditsAccrued(credit.clone()))
            .await;
        Ok(Some(credit))
    }

    /// Emits one `usage_alert` per window at or past the alert fraction.
    pub async fn evaluate_limits(&self, user_id: Uuid) -> Result<Vec<Notification>, Error> {
        let limits = self.limits(user_id).await?;
        let now = Utc::now();
        let mut alerts = Vec::new();

        for period in UsagePeriod::LIMITED {
            let since = window_start(period, now, self.timezone);
            let total = self.usage.breakdown_since(user_id, since).await?.total;
            if !limits.should_alert(period, total) {
                continue;
            }
            let limit = limits.limit_for(period).unwrap_or_default();
            let notification = Notification::new(
                user_id,
                NotificationType::UsageAlert,
                format!("{} Usage Alert", capitalized(period)),
                format!(
                    "You have used {} kWh this {}, approaching your {} limit.",
                    total.normalize(),
                    period.noun(),
                    period
                ),
            )
            .with_data(json!({
                "period": period,
                "usage": total,
                "limit": limit,
                "threshold": limits.alert_threshold,
            }));
            alerts.push(self.notifications.create(notification).await?);
        }
        Ok(alerts)
    }

    pub async fn stats(&self, user_id: Uuid, period: UsagePeriod) -> Result<UsageStats, Error> {
        let since = window_start(period, Utc::now(), self.timezone);
        let breakdown = self.usage.breakdown_since(user_id, since).await?;
        let logs = self.usage.list_for_user(user_id, since).await?;
        Ok(UsageStats {
            period,
            total_usage: breakdown.total,
            renewable_usage: breakdown.renewable,
            non_renewable_usage: breakdown.non_renewable,
            carbon_saved: breakdown.renewable * self.policy.co2_per_kwh,
            logs,
        })
    }

    pub async fn list_all(&self, page: PageRequest) -> Result<Page<UsageLog>, Error> {
        let (items, total) = self.usage.list_all(page).await?;
        Ok(Page::new(items, page, total))
    }

    /// The user's limits, created with defaults on first read.
    pub async fn limits(&self, user_id: Uuid) -> Result<UsageLimit, Error> {
        if let Some(l) = self.limits.get(user_id).await? {
            return Ok(l);
        }
        self.limits
            .get_or_create(&UsageLimit::with_defaults(user_id, &self.defaults))
            .await
    }

    pub async fn update_limits(&self, user_id: Uuid, update: &UsageLimitUpdate) -> Result<UsageLimit, Error> {
        let mut limit = match self.limits.get(user_id).await? {
            Some(l) => l,
            None => UsageLimit::with_defaults(user_id, &self.defaults),
        };
        update.apply_to(&mut limit);
        self.limits.upsert(&limit).await
    }
}
