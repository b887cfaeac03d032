// Raw feature usage pages
//
// Proxies one page of the usage feed without evaluating thresholds.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use quotawatch_core::{PageRequest, UsageRecord};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common::{bad_request, feature_param, feed_error, ApiError, ErrorResponse};
use super::ApiState;

/// Query parameters for fetching a usage page
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FeatureUsageQuery {
    /// Feature to read usage for
    pub feature_id: Option<String>,
    /// Records to skip (default: 0)
    pub offset: Option<usize>,
    /// Page size (default: the poller's page size)
    pub limit: Option<usize>,
}

/// Position of a page within the full result set
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
    /// Records on this page
    pub count: usize,
    /// Another page may follow
    pub has_more: bool,
}

/// One page of per-company usage
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeatureUsageResponse {
    pub data: Vec<UsageRecord>,
    pub pagination: Pagination,
}

pub fn routes(state: ApiState) -> Router {
    Router::new()
        .route("/v1/feature-usage", get(get_feature_usage))
        .with_state(state)
}

/// GET /v1/feature-usage - One page of usage for a feature
#[utoipa::path(
    get,
    path = "/v1/feature-usage",
    params(FeatureUsageQuery),
    responses(
        (status = 200, description = "Usage page", body = FeatureUsageResponse),
        (status = 400, description = "Missing featureId or API credential", body = ErrorResponse),
        (status = 502, description = "Usage feed request failed", body = ErrorResponse),
    ),
    tag = "usage"
)]
pub async fn get_feature_usage(
    State(state): State<ApiState>,
    Query(query): Query<FeatureUsageQuery>,
) -> Result<Json<FeatureUsageResponse>, ApiError> {
    let feature_id =
        feature_param(query.feature_id).ok_or_else(|| bad_request("featureId is required"))?;

    let monitor = state.poller.monitor();
    let request = PageRequest::new(
        query.offset.unwrap_or(0),
        query.limit.unwrap_or_else(|| monitor.page_size()),
    );

    let page = monitor
        .feed()
        .fetch_page(&feature_id, request)
        .await
        .map_err(|e| feed_error(&e))?;

    let pagination = Pagination {
        offset: page.request.offset,
        limit: page.request.limit,
        count: page.records.len(),
        has_more: page.has_more,
    };

    Ok(Json(FeatureUsageResponse {
        data: page.records,
        pagination,
    }))
}
