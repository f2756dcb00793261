// File: voltledger-common/src/models/usage.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One recorded consumption event. Never updated after insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_id: Uuid,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub metadata: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum UsagePeriod {
    Daily,
    Weekly,
    #[default]
    Monthly,
    All,
}

impl UsagePeriod {
    /// The windows a usage limit is enforced on.
    pub const LIMITED: [UsagePeriod; 3] = [UsagePeriod::Daily, UsagePeriod::Weekly, UsagePeriod::Monthly];

    pub fn noun(&self) -> &'static str {
        match self {
            UsagePeriod::Daily => "day",
            UsagePeriod::Weekly => "week",
            UsagePeriod::Monthly => "month",
            UsagePeriod::All => "period",
        }
    }
}

impl fmt::Display for UsagePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsagePeriod::Daily => write!(f, "daily"),
            UsagePeriod::Weekly => write!(f, "weekly"),
            UsagePeriod::Monthly => write!(f, "monthly"),
            UsagePeriod::All => write!(f, "all"),
        }
    }
}

impl FromStr for UsagePeriod {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(UsagePeriod::Daily),
            "weekly" => Ok(UsagePeriod::Weekly),
            "monthly" => Ok(UsagePeriod::Monthly),
            "all" => Ok(UsagePeriod::All),
            _ => Err(format!("Unknown usage period: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimitDefaults {
    pub daily_limit: Decimal,
    pub weekly_limit: Decimal,
    pub monthly_limit: Decimal,
    pub alert_threshold: Decimal,
}

impl Default for UsageLimitDefaults {
    fn default() -> Self {
        Self {
            daily_limit: Decimal::from(20),
            weekly_limit: Decimal::from(120),
            monthly_limit: Decimal::from(450),
            alert_threshold: Decimal::new(8, 1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub daily_limit: Decimal,
    pub weekly_limit: Decimal,
    pub monthly_limit: Decimal,
    pub alert_threshold: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UsageLimit {
    pub fn with_defaults(user_id: Uuid, defaults: &UsageLimitDefaults) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            daily_limit: defaults.daily_limit,
            weekly_limit: defaults.weekly_limit,
            monthly_limit: defaults.monthly_limit,
            alert_threshold: defaults.alert_threshold,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn limit_for(&self, period: UsagePeriod) -> Option<Decimal> {
        match period {
            UsagePeriod::Daily => Some(self.daily_limit),
            UsagePeriod::Weekly => Some(self.weekly_limit),
            UsagePeriod::Monthly => Some(self.monthly_limit),
            UsagePeriod::All => None,
        }
    }

    /// True once `total` has reached the alert fraction of the period's limit.
    pub fn should_alert(&self, period: UsagePeriod, total: Decimal) -> bool {
        match self.limit_for(period) {
            Some(limit) => total >= limit * self.alert_threshold,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimitUpdate {
    pub daily_limit: Option<Decimal>,
    pub weekly_limit: Option<Decimal>,
    pub monthly_limit: Option<Decimal>,
    pub alert_threshold: Option<Decimal>,
}

impl UsageLimitUpdate {
    pub fn apply_to(&self, limit: &mut UsageLimit) {
        if let Some(v) = self.daily_limit {
            limit.daily_limit = v;
        }
        if let Some(v) = self.weekly_limit {
            limit.weekly_limit = v;
        }
        if let Some(v) = self.monthly_limit {
            limit.monthly_limit = v;
        }
        if let Some(v) = self.alert_threshold {
            limit.alert_threshold = v;
        }
        limit.updated_at = Utc::now();
    }
}

/// Usage totals for a window, split by the token's type.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageBreakdown {
    pub total: Decimal,
    pub renewable: Decimal,
    pub non_renewable: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub period: UsagePeriod,
    pub total_usage: Decimal,
    pub renewable_usage: Decimal,
    pub non_renewable_usage: Decimal,
    /// kg of CO2 avoided by renewable usage in the window.
    pub carbon_saved: Decimal,
    pub logs: Vec<UsageLog>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn alert_fires_at_threshold_fraction() {
        let limit = UsageLimit::with_defaults(Uuid::new_v4(), &UsageLimitDefaults::default());
        assert!(!limit.should_alert(UsagePeriod::Daily, dec!(15.99)));
        assert!(limit.should_alert(UsagePeriod::Daily, dec!(16)));
        assert!(limit.should_alert(UsagePeriod::Daily, dec!(25)));
        assert!(!limit.should_alert(UsagePeriod::Weekly, dec!(25)));
        assert!(!limit.should_alert(UsagePeriod::All, dec!(10000)));
    }

    #[test]
    fn partial_update_keeps_unset_fields() {
        let mut limit = UsageLimit::with_defaults(Uuid::new_v4(), &UsageLimitDefaults::default());
        UsageLimitUpdate { daily_limit: Some(dec!(30)), ..Default::default() }.apply_to(&mut limit);
        assert_eq!(limit.daily_limit, dec!(30));
        assert_eq!(limit.weekly_limit, dec!(120));
        assert_eq!(limit.alert_threshold, dec!(0.8));
    }
}
