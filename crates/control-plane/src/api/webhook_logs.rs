// Webhook activity log routes

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use quotawatch_core::WebhookLogEntry;

use super::common::ListResponse;
use super::ApiState;

pub fn routes(state: ApiState) -> Router {
    Router::new()
        .route("/v1/webhook-logs", get(list_webhook_logs).delete(clear_webhook_logs))
        .with_state(state)
}

/// GET /v1/webhook-logs - Recent deliveries, newest first
#[utoipa::path(
    get,
    path = "/v1/webhook-logs",
    responses(
        (status = 200, description = "Recent webhook deliveries", body = ListResponse<WebhookLogEntry>),
    ),
    tag = "webhooks"
)]
pub async fn list_webhook_logs(
    State(state): State<ApiState>,
) -> Json<ListResponse<WebhookLogEntry>> {
    Json(ListResponse::new(
        state.poller.monitor().activity_log().entries(),
    ))
}

/// DELETE /v1/webhook-logs - Clear the activity log
#[utoipa::path(
    delete,
    path = "/v1/webhook-logs",
    responses(
        (status = 204, description = "Log cleared"),
    ),
    tag = "webhooks"
)]
pub async fn clear_webhook_logs(State(state): State<ApiState>) -> StatusCode {
    state.poller.monitor().activity_log().clear();
    StatusCode::NO_CONTENT
}
