// Latest usage snapshot for dashboards

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::usage::{sort_by_utilization, UsageLevel, UsageRecord};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Result of the most recent polling cycles for one feature.
///
/// A failed cycle keeps the previous records and only sets `last_error`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub feature_id: Option<String>,
    /// Records sorted by utilization, highest first.
    pub records: Vec<UsageRecord>,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl UsageSnapshot {
    /// Replace records after a successful cycle
    pub fn apply_success(
        &mut self,
        feature_id: &str,
        mut records: Vec<UsageRecord>,
        at: DateTime<Utc>,
    ) {
        sort_by_utilization(&mut records);
        self.feature_id = Some(feature_id.to_string());
        self.records = records;
        self.last_updated = Some(at);
        self.last_error = None;
    }

    /// Keep the previous records, remember the error
    pub fn apply_failure(&mut self, feature_id: &str, error: impl Into<String>) {
        if self.feature_id.as_deref() != Some(feature_id) {
            self.records.clear();
            self.last_updated = None;
        }
        self.feature_id = Some(feature_id.to_string());
        self.last_error = Some(error.into());
    }

    /// Records with derived dashboard fields
    pub fn views(&self) -> Vec<UsageView> {
        self.records.iter().map(UsageView::from).collect()
    }
}

/// A usage record plus its derived utilization fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UsageView {
    #[serde(flatten)]
    pub record: UsageRecord,
    pub percentage: f64,
    /// Progress bar fill, 0..=100.
    pub progress: f64,
    pub level: UsageLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_label: Option<String>,
}

impl From<&UsageRecord> for UsageView {
    fn from(record: &UsageRecord) -> Self {
        Self {
            record: record.clone(),
            percentage: record.percentage(),
            progress: record.progress(),
            level: record.level(),
            limit_label: record.period.limit_label().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::{Allocation, UsagePeriod};

    fn record(company_id: &str, usage: f64) -> UsageRecord {
        UsageRecord {
            company_id: company_id.to_string(),
            company_name: company_id.to_string(),
            plan_name: None,
            feature_id: "feat_1".to_string(),
            feature_name: "Seats".to_string(),
            period: UsagePeriod::CurrentDay,
            usage,
            allocation: Allocation::Limited(100.0),
        }
    }

    #[test]
    fn test_success_sorts_and_clears_error() {
        let mut snapshot = UsageSnapshot {
            last_error: Some("old".to_string()),
            ..Default::default()
        };
        snapshot.apply_success("feat_1", vec![record("a", 10.0), record("b", 95.0)], Utc::now());

        assert_eq!(snapshot.records[0].company_id, "b");
        assert!(snapshot.last_error.is_none());
        assert!(snapshot.last_updated.is_some());
    }

    #[test]
    fn test_failure_keeps_records_for_same_feature() {
        let mut snapshot = UsageSnapshot::default();
        snapshot.apply_success("feat_1", vec![record("a", 10.0)], Utc::now());
        snapshot.apply_failure("feat_1", "API error (500): boom");

        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.last_error.as_deref(), Some("API error (500): boom"));

        snapshot.apply_failure("feat_2", "API error (500): boom");
        assert!(snapshot.records.is_empty());
        assert_eq!(snapshot.feature_id.as_deref(), Some("feat_2"));
    }

    #[test]
    fn test_view_fields() {
        let view = UsageView::from(&record("a", 95.0));
        assert_eq!(view.level, UsageLevel::Critical);
        assert_eq!(view.limit_label.as_deref(), Some("Daily Limit"));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["companyId"], "a");
        assert_eq!(json["percentage"], 95.0);
        assert_eq!(json["level"], "critical");
    }
}
