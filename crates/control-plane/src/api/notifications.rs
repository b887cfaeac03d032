// Manual notification runs
//
// Runs a cycle on the shared poller, so a manual run never overlaps a
// scheduled one and commits to the same notification state.

use axum::{extract::State, routing::post, Json, Router};
use quotawatch_core::{DeliveryOutcome, NotificationEvent};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::{bad_request, feature_param, poller_error, ApiError, ErrorResponse};
use super::ApiState;

/// Request to run a notification cycle
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunNotificationsRequest {
    /// Feature to evaluate; becomes the polled feature
    #[serde(default)]
    #[schema(example = "feat_api_calls")]
    pub feature_id: Option<String>,
}

/// Result of a notification cycle
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunNotificationsResponse {
    pub feature_id: String,
    /// Companies evaluated in this cycle
    pub companies_evaluated: usize,
    /// Threshold crossings detected
    pub notifications: Vec<NotificationEvent>,
    /// Delivery result of each notification
    pub outcomes: Vec<DeliveryOutcome>,
}

pub fn routes(state: ApiState) -> Router {
    Router::new()
        .route("/v1/usage-notifications", post(run_notifications))
        .with_state(state)
}

/// POST /v1/usage-notifications - Evaluate thresholds now and send notifications
#[utoipa::path(
    post,
    path = "/v1/usage-notifications",
    request_body = RunNotificationsRequest,
    responses(
        (status = 200, description = "Cycle completed", body = RunNotificationsResponse),
        (status = 400, description = "Missing featureId or API credential", body = ErrorResponse),
        (status = 409, description = "Feature changed while the cycle was running", body = ErrorResponse),
        (status = 502, description = "Usage feed request failed", body = ErrorResponse),
        (status = 503, description = "Poller is not running", body = ErrorResponse),
    ),
    tag = "notifications"
)]
pub async fn run_notifications(
    State(state): State<ApiState>,
    Json(req): Json<RunNotificationsRequest>,
) -> Result<Json<RunNotificationsResponse>, ApiError> {
    let feature_id =
        feature_param(req.feature_id).ok_or_else(|| bad_request("featureId is required"))?;

    let report = state
        .poller
        .refresh(Some(feature_id))
        .await
        .map_err(|e| poller_error(&e))?;

    tracing::info!(
        feature_id = %report.feature_id,
        notifications = report.events.len(),
        "Manual notification run completed"
    );

    Ok(Json(RunNotificationsResponse {
        feature_id: report.feature_id,
        companies_evaluated: report.companies_evaluated,
        notifications: report.events,
        outcomes: report.outcomes,
    }))
}
