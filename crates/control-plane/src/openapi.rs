// OpenAPI specification generation
//
// This module defines the OpenAPI spec for the QuotaWatch API.
// It can be used by both the main API server (for Swagger UI)
// and the export-openapi binary (for static spec generation).

use crate::api;
use crate::api::{ErrorResponse, ListResponse};
use quotawatch_core::{
    DeliveryOutcome, DeliveryStatus, NotificationEvent, UsageLevel, UsagePeriod, UsageRecord,
    UsageView, WebhookLogEntry,
};
use utoipa::OpenApi;

/// OpenAPI documentation for the QuotaWatch API
#[derive(OpenApi)]
#[openapi(
    paths(
        api::feature_usage::get_feature_usage,
        api::notifications::run_notifications,
        api::usage::get_usage,
        api::usage::get_feature,
        api::usage::set_feature,
        api::webhook_logs::list_webhook_logs,
        api::webhook_logs::clear_webhook_logs,
    ),
    components(
        schemas(
            UsageRecord, UsagePeriod, UsageLevel, UsageView,
            NotificationEvent, DeliveryOutcome, DeliveryStatus,
            WebhookLogEntry,
            ErrorResponse,
            ListResponse<WebhookLogEntry>,
            api::feature_usage::FeatureUsageResponse, api::feature_usage::Pagination,
            api::notifications::RunNotificationsRequest, api::notifications::RunNotificationsResponse,
            api::usage::UsageResponse, api::usage::SetFeatureRequest, api::usage::FeatureResponse,
        )
    ),
    tags(
        (name = "usage", description = "Feature usage and polled feature selection"),
        (name = "notifications", description = "Threshold notification runs"),
        (name = "webhooks", description = "Webhook delivery activity")
    ),
    info(
        title = "QuotaWatch API",
        version = "0.1.0",
        description = "API for monitoring feature usage and threshold notifications",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI spec as a pretty-printed JSON string
    pub fn to_json() -> Result<String, serde_json::Error> {
        Self::openapi().to_pretty_json()
    }
}
