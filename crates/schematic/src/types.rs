// Wire types for `GET /feature-companies`

use quotawatch_core::{Allocation, UsagePeriod, UsageRecord};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct FeatureCompaniesResponse {
    #[serde(default)]
    pub data: Vec<FeatureCompany>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeatureCompany {
    pub company: CompanyRef,
    pub feature: FeatureRef,
    #[serde(default)]
    pub period: Option<UsagePeriod>,
    #[serde(default)]
    pub usage: f64,
    #[serde(default)]
    pub allocation: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompanyRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub plan: Option<PlanRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeatureRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlanRef {
    pub name: String,
}

impl From<FeatureCompany> for UsageRecord {
    fn from(row: FeatureCompany) -> Self {
        UsageRecord {
            company_id: row.company.id,
            company_name: row.company.name,
            plan_name: row.company.plan.map(|p| p.name),
            feature_id: row.feature.id,
            feature_name: row.feature.name,
            period: row.period.unwrap_or_default(),
            // Negative usage is not meaningful for quotas
            usage: row.usage.max(0.0),
            allocation: Allocation::from(row.allocation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_row() {
        let json = serde_json::json!({
            "data": [{
                "company": {
                    "id": "comp_1",
                    "name": "Acme",
                    "logo_url": "https://example.com/logo.png",
                    "plan": { "name": "Enterprise" }
                },
                "feature": { "id": "feat_1", "name": "API Calls" },
                "period": "current_month",
                "usage": 850,
                "allocation": 1000
            }, {
                "company": { "id": "comp_2", "name": "Globex" },
                "feature": { "id": "feat_1", "name": "API Calls" },
                "period": null,
                "usage": 12,
                "allocation": null
            }]
        });

        let response: FeatureCompaniesResponse = serde_json::from_value(json).unwrap();
        let records: Vec<UsageRecord> = response.data.into_iter().map(Into::into).collect();

        assert_eq!(records[0].company_id, "comp_1");
        assert_eq!(records[0].plan_name.as_deref(), Some("Enterprise"));
        assert_eq!(records[0].period, UsagePeriod::CurrentMonth);
        assert_eq!(records[0].allocation, Allocation::Limited(1000.0));
        assert_eq!(records[0].percentage(), 85.0);

        assert_eq!(records[1].plan_name, None);
        assert_eq!(records[1].period, UsagePeriod::Other);
        assert_eq!(records[1].allocation, Allocation::Unlimited);
    }
}
