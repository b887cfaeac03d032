// Common DTOs for public API
//
// These types are shared across multiple API endpoints.

use axum::http::StatusCode;
use axum::Json;
use quotawatch_core::FeedError;
use quotawatch_worker::PollerError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standard error response for API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message describing what went wrong.
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    /// Convert to axum response tuple
    pub fn into_response(self, status: StatusCode) -> (StatusCode, Json<Self>) {
        (status, Json(self))
    }
}

/// Error half of every handler's result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn bad_request(message: impl Into<String>) -> ApiError {
    ErrorResponse::new(message).into_response(StatusCode::BAD_REQUEST)
}

/// Map a feed failure: local misconfiguration is the caller's problem, anything
/// else is an upstream failure
pub fn feed_error(error: &FeedError) -> ApiError {
    if error.is_configuration() {
        ErrorResponse::new(error.to_string()).into_response(StatusCode::BAD_REQUEST)
    } else {
        tracing::warn!(error = %error, "Usage feed request failed");
        ErrorResponse::new(error.to_string()).into_response(StatusCode::BAD_GATEWAY)
    }
}

pub fn poller_error(error: &PollerError) -> ApiError {
    match error {
        PollerError::Fetch(feed) => feed_error(feed),
        PollerError::NoFeature => bad_request("featureId is required"),
        PollerError::Superseded { .. } => {
            ErrorResponse::new(error.to_string()).into_response(StatusCode::CONFLICT)
        }
        PollerError::Shutdown | PollerError::ChannelClosed => {
            ErrorResponse::new(error.to_string()).into_response(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Response wrapper for list endpoints.
/// All list endpoints return responses wrapped in a `data` field.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListResponse<T> {
    /// Array of items returned by the list operation.
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

/// Trim a client-supplied feature id; blank means absent
pub fn feature_param(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_error_status() {
        let (status, _) = feed_error(&FeedError::missing_config("SCHEMATIC_API_KEY not set"));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, Json(body)) = feed_error(&FeedError::api(500, "boom"));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.error, "API error (500): boom");
    }

    #[test]
    fn test_poller_error_status() {
        assert_eq!(
            poller_error(&PollerError::superseded("feat_1")).0,
            StatusCode::CONFLICT
        );
        assert_eq!(poller_error(&PollerError::NoFeature).0, StatusCode::BAD_REQUEST);
        assert_eq!(
            poller_error(&PollerError::Shutdown).0,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            poller_error(&PollerError::Fetch(FeedError::http("timeout"))).0,
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_feature_param() {
        assert_eq!(feature_param(Some(" feat_1 ".into())).as_deref(), Some("feat_1"));
        assert_eq!(feature_param(Some("  ".into())), None);
        assert_eq!(feature_param(None), None);
    }
}
