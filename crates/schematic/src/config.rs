// Schematic client configuration, loaded from environment variables.

use std::env;
use std::time::Duration;

use quotawatch_core::FeedError;

/// Default Schematic API host
pub const DEFAULT_BASE_URL: &str = "https://api.schematichq.com";

/// Default request timeout for feed calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the Schematic usage feed
#[derive(Debug, Clone)]
pub struct SchematicConfig {
    /// Secret API key sent as `X-Schematic-Api-Key`
    pub api_key: Option<String>,

    /// API host (e.g., https://api.schematichq.com)
    pub base_url: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl SchematicConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `SCHEMATIC_API_KEY`: API key (fetches fail without it)
    /// - `SCHEMATIC_BASE_URL`: API host (default: https://api.schematichq.com)
    /// - `HTTP_TIMEOUT_SECS`: Request timeout in seconds (default: 30)
    ///
    /// A malformed `HTTP_TIMEOUT_SECS` is an error rather than a silent default.
    pub fn from_env() -> Result<Self, FeedError> {
        let api_key = env::var("SCHEMATIC_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let base_url =
            env::var("SCHEMATIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout = parse_timeout(env::var("HTTP_TIMEOUT_SECS").ok())?;

        Ok(Self {
            api_key,
            base_url,
            timeout,
        })
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL of the feature-companies listing
    pub fn feature_companies_url(&self) -> String {
        format!("{}/feature-companies", self.base_url.trim_end_matches('/'))
    }
}

fn parse_timeout(value: Option<String>) -> Result<Duration, FeedError> {
    let Some(raw) = value else {
        return Ok(DEFAULT_TIMEOUT);
    };
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| {
            FeedError::invalid_config("HTTP_TIMEOUT_SECS", raw.as_str(), e.to_string())
        })?;
    if secs == 0 {
        return Err(FeedError::invalid_config(
            "HTTP_TIMEOUT_SECS",
            raw.as_str(),
            "must be at least 1",
        ));
    }
    Ok(Duration::from_secs(secs))
}

impl Default for SchematicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_companies_url() {
        let config = SchematicConfig::new("sch_key");
        assert_eq!(
            config.feature_companies_url(),
            "https://api.schematichq.com/feature-companies"
        );

        // Test with trailing slash
        let config = config.with_base_url("http://localhost:8080/");
        assert_eq!(
            config.feature_companies_url(),
            "http://localhost:8080/feature-companies"
        );
    }

    #[test]
    fn test_default_has_no_key() {
        let config = SchematicConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout(None).unwrap(), DEFAULT_TIMEOUT);
        assert_eq!(
            parse_timeout(Some(" 5 ".to_string())).unwrap(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_malformed_timeout_is_rejected() {
        let err = parse_timeout(Some("30s".to_string())).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().starts_with("Invalid value for HTTP_TIMEOUT_SECS: '30s'"));

        assert!(parse_timeout(Some("0".to_string())).is_err());
    }
}
