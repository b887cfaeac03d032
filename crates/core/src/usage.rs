// Usage domain types
//
// A UsageRecord is one company's consumption of one feature for its current
// metering period, as reported by the entitlements feed.

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Usage quota for a company/feature pair.
///
/// Serialized as a plain number, or `null` for unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Allocation {
    /// A finite quota.
    Limited(f64),
    /// No quota; never triggers a threshold.
    Unlimited,
}

impl Allocation {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Allocation::Unlimited)
    }

    /// The finite quota, if any
    pub fn limit(&self) -> Option<f64> {
        match self {
            Allocation::Limited(limit) => Some(*limit),
            Allocation::Unlimited => None,
        }
    }
}

impl From<Option<f64>> for Allocation {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(limit) => Allocation::Limited(limit),
            None => Allocation::Unlimited,
        }
    }
}

impl From<Allocation> for Option<f64> {
    fn from(value: Allocation) -> Self {
        value.limit()
    }
}

impl std::fmt::Display for Allocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Allocation::Limited(limit) => write!(f, "{}", limit),
            Allocation::Unlimited => write!(f, "∞"),
        }
    }
}

/// Metering period of a usage record.
/// - `current_day`: usage resets daily
/// - `current_month`: usage resets monthly
/// - `current_year`: usage resets yearly
/// - `other`: any period the feed reports that is not one of the above
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum UsagePeriod {
    CurrentDay,
    CurrentMonth,
    CurrentYear,
    #[default]
    #[serde(other)]
    Other,
}

impl UsagePeriod {
    /// Dashboard label for periods that reset on a calendar boundary
    pub fn limit_label(&self) -> Option<&'static str> {
        match self {
            UsagePeriod::CurrentDay => Some("Daily Limit"),
            UsagePeriod::CurrentMonth => Some("Monthly Limit"),
            UsagePeriod::CurrentYear => Some("Yearly Limit"),
            UsagePeriod::Other => None,
        }
    }
}

impl std::fmt::Display for UsagePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsagePeriod::CurrentDay => write!(f, "current_day"),
            UsagePeriod::CurrentMonth => write!(f, "current_month"),
            UsagePeriod::CurrentYear => write!(f, "current_year"),
            UsagePeriod::Other => write!(f, "other"),
        }
    }
}

/// One company's usage of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    /// Identifier of the company in the entitlements system.
    pub company_id: String,
    /// Display name of the company.
    pub company_name: String,
    /// Name of the company's plan, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    pub feature_id: String,
    pub feature_name: String,
    #[serde(default)]
    pub period: UsagePeriod,
    /// Consumed amount for the current period. Never negative.
    pub usage: f64,
    /// Quota for the period; `null` means unlimited.
    #[cfg_attr(feature = "openapi", schema(value_type = Option<f64>))]
    pub allocation: Allocation,
}

impl UsageRecord {
    /// Usage as a percentage of the allocation (see [`usage_percentage`])
    pub fn percentage(&self) -> f64 {
        usage_percentage(self.usage, self.allocation)
    }

    /// Progress bar fill, clamped to 0..=100
    pub fn progress(&self) -> f64 {
        self.percentage().clamp(0.0, 100.0)
    }

    pub fn level(&self) -> UsageLevel {
        UsageLevel::from_percentage(self.percentage())
    }
}

/// Usage as a percentage of allocation.
///
/// Unlimited allocations and zero usage are always 0%. A zero allocation is
/// divided as if it were 1, so any positive usage against it is over quota.
pub fn usage_percentage(usage: f64, allocation: Allocation) -> f64 {
    match allocation {
        Allocation::Unlimited => 0.0,
        Allocation::Limited(_) if usage == 0.0 => 0.0,
        Allocation::Limited(limit) => {
            let divisor = if limit > 0.0 { limit } else { 1.0 };
            usage / divisor * 100.0
        }
    }
}

/// Severity band of a utilization percentage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UsageLevel {
    /// At or below 75%.
    Normal,
    /// Above 75%, at or below 90%.
    Warning,
    /// Above 90%.
    Critical,
}

impl UsageLevel {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage > 90.0 {
            UsageLevel::Critical
        } else if percentage > 75.0 {
            UsageLevel::Warning
        } else {
            UsageLevel::Normal
        }
    }
}

/// Sort records by utilization, highest first. Ties keep feed order.
pub fn sort_by_utilization(records: &mut [UsageRecord]) {
    records.sort_by(|a, b| b.percentage().total_cmp(&a.percentage()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(company_id: &str, usage: f64, allocation: Allocation) -> UsageRecord {
        UsageRecord {
            company_id: company_id.to_string(),
            company_name: format!("{} Inc", company_id),
            plan_name: None,
            feature_id: "feat_1".to_string(),
            feature_name: "API Calls".to_string(),
            period: UsagePeriod::CurrentMonth,
            usage,
            allocation,
        }
    }

    #[test]
    fn test_percentage_limited() {
        assert_eq!(usage_percentage(85.0, Allocation::Limited(100.0)), 85.0);
        assert_eq!(usage_percentage(50.0, Allocation::Limited(200.0)), 25.0);
    }

    #[test]
    fn test_percentage_unlimited_is_zero() {
        assert_eq!(usage_percentage(1_000_000.0, Allocation::Unlimited), 0.0);
    }

    #[test]
    fn test_percentage_zero_usage_is_zero() {
        assert_eq!(usage_percentage(0.0, Allocation::Limited(0.0)), 0.0);
    }

    #[test]
    fn test_percentage_zero_allocation() {
        assert_eq!(usage_percentage(5.0, Allocation::Limited(0.0)), 500.0);
    }

    #[test]
    fn test_allocation_serde_null_is_unlimited() {
        let json = serde_json::json!({
            "companyId": "c1",
            "companyName": "Acme",
            "featureId": "feat_1",
            "featureName": "Seats",
            "period": "current_day",
            "usage": 3.0,
            "allocation": null
        });
        let parsed: UsageRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.allocation, Allocation::Unlimited);
        assert_eq!(parsed.period, UsagePeriod::CurrentDay);

        let back = serde_json::to_value(&parsed).unwrap();
        assert!(back["allocation"].is_null());
    }

    #[test]
    fn test_unknown_period_is_other() {
        let period: UsagePeriod = serde_json::from_str("\"all_time\"").unwrap();
        assert_eq!(period, UsagePeriod::Other);
        assert_eq!(period.limit_label(), None);
        assert_eq!(UsagePeriod::CurrentYear.limit_label(), Some("Yearly Limit"));
    }

    #[test]
    fn test_level_bands() {
        assert_eq!(UsageLevel::from_percentage(75.0), UsageLevel::Normal);
        assert_eq!(UsageLevel::from_percentage(75.5), UsageLevel::Warning);
        assert_eq!(UsageLevel::from_percentage(90.0), UsageLevel::Warning);
        assert_eq!(UsageLevel::from_percentage(120.0), UsageLevel::Critical);
    }

    #[test]
    fn test_progress_is_clamped() {
        let over = record("c1", 150.0, Allocation::Limited(100.0));
        assert_eq!(over.progress(), 100.0);
    }

    #[test]
    fn test_sort_by_utilization() {
        let mut records = vec![
            record("low", 10.0, Allocation::Limited(100.0)),
            record("unlimited", 999.0, Allocation::Unlimited),
            record("high", 95.0, Allocation::Limited(100.0)),
            record("mid", 50.0, Allocation::Limited(100.0)),
        ];
        sort_by_utilization(&mut records);
        let order: Vec<_> = records.iter().map(|r| r.company_id.as_str()).collect();
        assert_eq!(order, vec!["high", "mid", "low", "unlimited"]);
    }
}
