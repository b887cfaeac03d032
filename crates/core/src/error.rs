// Error types for the usage feed boundary

use thiserror::Error;

/// Result type alias for feed operations
pub type Result<T> = std::result::Result<T, FeedError>;

/// Errors that can occur while fetching usage snapshots
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    /// Required configuration (API credential) is absent
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    /// A configuration value is present but malformed
    #[error("Invalid value for {name}: '{value}' ({reason})")]
    InvalidConfiguration {
        name: String,
        value: String,
        reason: String,
    },

    /// Transport-level failure (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(String),

    /// The feed answered with a non-2xx status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl FeedError {
    /// Create a missing configuration error
    pub fn missing_config(msg: impl Into<String>) -> Self {
        FeedError::MissingConfiguration(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        FeedError::InvalidConfiguration {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport error
    pub fn http(msg: impl Into<String>) -> Self {
        FeedError::Http(msg.into())
    }

    /// Create an API status error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        FeedError::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        FeedError::Decode(msg.into())
    }

    /// Whether the error comes from local configuration rather than the remote feed
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FeedError::MissingConfiguration(_) | FeedError::InvalidConfiguration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = FeedError::api(503, "upstream unavailable");
        assert_eq!(err.to_string(), "API error (503): upstream unavailable");
    }

    #[test]
    fn test_is_configuration() {
        assert!(FeedError::missing_config("SCHEMATIC_API_KEY not set").is_configuration());
        assert!(FeedError::invalid_config("HTTP_TIMEOUT_SECS", "soon", "not a number").is_configuration());
        assert!(!FeedError::http("connection refused").is_configuration());
    }
}
