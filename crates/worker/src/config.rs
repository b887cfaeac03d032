// Monitor configuration
//
// Loaded from environment variables (after `.env` via dotenvy in the binaries).
// Malformed numbers are configuration errors; absent values fall back to defaults.

use std::env;
use std::time::Duration;

use quotawatch_core::{ThresholdSet, DEFAULT_PAGE_SIZE};
use thiserror::Error;

/// Default time between polling cycles (5 minutes)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Errors raised while reading configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}' ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Configuration for a usage monitor and its poller
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Feature to poll; the poller idles until one is set
    pub feature_id: Option<String>,

    /// Time between interval-triggered cycles
    pub poll_interval: Duration,

    /// Records requested per page
    pub page_size: usize,

    /// Stop paging after this many pages in one cycle
    pub max_pages: Option<usize>,

    /// Thresholds evaluated highest first
    pub thresholds: ThresholdSet,

    /// Pending manual refresh requests before callers wait
    pub command_buffer: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            feature_id: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: None,
            thresholds: ThresholdSet::default(),
            command_buffer: 16,
        }
    }
}

impl MonitorConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `FEATURE_ID`: Feature to poll (optional)
    /// - `POLL_INTERVAL_SECS`: Seconds between cycles (default: 300)
    /// - `PAGE_SIZE`: Records per page (default: 100)
    /// - `MAX_PAGES`: Page cap per cycle (default: unlimited)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let feature_id = env::var("FEATURE_ID")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let poll_interval = parse_var::<u64>("POLL_INTERVAL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);

        let page_size = parse_var::<usize>("PAGE_SIZE")?.unwrap_or(defaults.page_size);

        let max_pages = parse_var::<usize>("MAX_PAGES")?;

        Ok(Self {
            feature_id,
            ..defaults
        }
        .with_poll_interval(poll_interval)
        .with_page_size(page_size)
        .with_max_pages(max_pages))
    }

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature_id(mut self, feature_id: impl Into<String>) -> Self {
        self.feature_id = Some(feature_id.into());
        self
    }

    /// Set the polling interval (at least one second)
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_secs(1));
        self
    }

    /// Set the page size (at least one)
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Cap the number of pages per cycle; `Some(0)` is treated as one page
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages.map(|m| m.max(1));
        self
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdSet) -> Self {
        self.thresholds = thresholds;
        self
    }
}

fn parse_var<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::Invalid {
                    name,
                    value,
                    reason: e.to_string(),
                })
        }
        _ => Ok(None),
    }
}
