// Poller errors

use quotawatch_core::FeedError;
use thiserror::Error;

/// Errors returned for a polling cycle
///
/// None of these stop the poller; the next interval tick starts a new cycle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PollerError {
    /// A page fetch failed; no state was advanced
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FeedError),

    /// No feature has been selected yet
    #[error("No feature selected")]
    NoFeature,

    /// The feature changed while the cycle was in flight; its results were discarded
    #[error("Cycle for feature '{feature_id}' was superseded by a feature change")]
    Superseded { feature_id: String },

    /// The poller is shutting down
    #[error("Poller is shutting down")]
    Shutdown,

    /// The poller task is gone
    #[error("Poller is not running")]
    ChannelClosed,
}

impl PollerError {
    pub fn superseded(feature_id: impl Into<String>) -> Self {
        PollerError::Superseded {
            feature_id: feature_id.into(),
        }
    }
}
