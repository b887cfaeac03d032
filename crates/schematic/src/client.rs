// HTTP client for the Schematic feature-companies listing

use async_trait::async_trait;
use quotawatch_core::{FeedError, PageRequest, UsageFeed, UsagePage, UsageRecord};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use tracing::{debug, instrument, warn};

use crate::config::SchematicConfig;
use crate::types::FeatureCompaniesResponse;

/// Header carrying the API key
const API_KEY_HEADER: &str = "X-Schematic-Api-Key";

/// Usage feed backed by the Schematic API
pub struct SchematicFeed {
    config: SchematicConfig,
    http: reqwest::Client,
}

impl SchematicFeed {
    /// Create a feed client.
    ///
    /// Fails only if the HTTP client cannot be built (e.g. TLS backend missing).
    pub fn new(config: SchematicConfig) -> Result<Self, FeedError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("QuotaWatch/1.0"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| FeedError::http(e.to_string()))?;

        Ok(Self { config, http })
    }

    pub fn from_env() -> Result<Self, FeedError> {
        Self::new(SchematicConfig::from_env()?)
    }

    pub fn config(&self) -> &SchematicConfig {
        &self.config
    }

    /// Whether an API key is configured
    pub fn has_credentials(&self) -> bool {
        self.config.api_key.is_some()
    }
}

#[async_trait]
impl UsageFeed for SchematicFeed {
    #[instrument(skip(self), fields(offset = request.offset, limit = request.limit))]
    async fn fetch_page(&self, feature_id: &str, request: PageRequest) -> Result<UsagePage, FeedError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| FeedError::missing_config("SCHEMATIC_API_KEY is not set"))?;

        let response = self
            .http
            .get(self.config.feature_companies_url())
            .header(API_KEY_HEADER, api_key)
            .query(&[
                ("feature_id", feature_id.to_string()),
                ("limit", request.limit.to_string()),
                ("offset", request.offset.to_string()),
            ])
            .send()
            .await
            .map_err(|e| FeedError::http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Schematic API returned an error");
            return Err(FeedError::api(status.as_u16(), message));
        }

        let body: FeatureCompaniesResponse = response
            .json()
            .await
            .map_err(|e| FeedError::decode(e.to_string()))?;

        let records: Vec<UsageRecord> = body.data.into_iter().map(Into::into).collect();
        debug!(count = records.len(), "Fetched usage page");

        Ok(UsagePage::inferred(records, request))
    }
}
