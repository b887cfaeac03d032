// Usage snapshot and feature selection

use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use quotawatch_core::UsageView;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::{bad_request, feature_param, ApiError, ErrorResponse};
use super::ApiState;

/// Latest polled usage, highest utilization first
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub feature_id: Option<String>,
    pub records: Vec<UsageView>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Error of the most recent cycle, if it failed
    pub last_error: Option<String>,
}

/// Request to change the polled feature
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetFeatureRequest {
    #[serde(default)]
    #[schema(example = "feat_api_calls")]
    pub feature_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeatureResponse {
    pub feature_id: Option<String>,
    /// Whether the polled feature changed
    pub changed: bool,
}

pub fn routes(state: ApiState) -> Router {
    Router::new()
        .route("/v1/usage", get(get_usage))
        .route("/v1/feature", put(set_feature).get(get_feature))
        .with_state(state)
}

/// GET /v1/usage - Latest usage snapshot
#[utoipa::path(
    get,
    path = "/v1/usage",
    responses(
        (status = 200, description = "Latest usage snapshot", body = UsageResponse),
    ),
    tag = "usage"
)]
pub async fn get_usage(State(state): State<ApiState>) -> Json<UsageResponse> {
    let snapshot = state.poller.monitor().snapshot();

    Json(UsageResponse {
        records: snapshot.views(),
        feature_id: snapshot.feature_id,
        last_updated: snapshot.last_updated,
        last_error: snapshot.last_error,
    })
}

/// GET /v1/feature - Currently polled feature
#[utoipa::path(
    get,
    path = "/v1/feature",
    responses(
        (status = 200, description = "Current feature", body = FeatureResponse),
    ),
    tag = "usage"
)]
pub async fn get_feature(State(state): State<ApiState>) -> Json<FeatureResponse> {
    Json(FeatureResponse {
        feature_id: state.poller.current_feature(),
        changed: false,
    })
}

/// PUT /v1/feature - Switch the polled feature
///
/// An in-flight cycle for the previous feature is cancelled and a new cycle starts.
#[utoipa::path(
    put,
    path = "/v1/feature",
    request_body = SetFeatureRequest,
    responses(
        (status = 200, description = "Feature selected", body = FeatureResponse),
        (status = 400, description = "Missing featureId", body = ErrorResponse),
    ),
    tag = "usage"
)]
pub async fn set_feature(
    State(state): State<ApiState>,
    Json(req): Json<SetFeatureRequest>,
) -> Result<Json<FeatureResponse>, ApiError> {
    let feature_id =
        feature_param(req.feature_id).ok_or_else(|| bad_request("featureId is required"))?;

    let changed = state.poller.set_feature(feature_id.as_str());
    if changed {
        tracing::info!(feature_id = %feature_id, "Polled feature changed");
    }

    Ok(Json(FeatureResponse {
        feature_id: Some(feature_id),
        changed,
    }))
}
