// QuotaWatch Control Plane Library
// Decision: Shared library for binaries (API server, OpenAPI export)

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// API routes and types (shared for OpenAPI generation)
pub mod api;

// OpenAPI spec generation
pub mod openapi;

pub use api::ApiState;
use openapi::ApiDoc;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    feature_id: Option<String>,
}

async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        feature_id: state.poller.current_feature(),
    })
}

/// Health, API routes, and Swagger UI without transport layers
pub fn app(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health).with_state(state.clone()))
        .merge(api::routes(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
}
