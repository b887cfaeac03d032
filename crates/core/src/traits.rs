// Core traits for pluggable backends
//
// These traits let the polling engine run against different backends:
// - HTTP implementations for production (Schematic feed, webhook dispatcher)
// - In-memory implementations for tests and local runs
// - No-op implementations when a collaborator is not configured

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::notification::{DeliveryOutcome, NotificationEvent};
use crate::usage::{Allocation, UsageRecord};

/// Default number of records requested per page
pub const DEFAULT_PAGE_SIZE: usize = 100;

// ============================================================================
// UsageFeed - Paginated source of usage snapshots
// ============================================================================

/// Offset-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: limit.max(1),
        }
    }

    /// First page of the given size
    pub fn first(limit: usize) -> Self {
        Self::new(0, limit)
    }

    /// The page immediately after this one
    pub fn next(&self) -> Self {
        Self::new(self.offset + self.limit, self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

/// One page of usage records
#[derive(Debug, Clone, PartialEq)]
pub struct UsagePage {
    pub records: Vec<UsageRecord>,
    pub request: PageRequest,
    /// More records may follow this page
    pub has_more: bool,
}

impl UsagePage {
    /// Build a page for a source that does not report totals.
    ///
    /// `has_more` is inferred: a full page means there may be another one.
    pub fn inferred(records: Vec<UsageRecord>, request: PageRequest) -> Self {
        let has_more = records.len() == request.limit;
        Self {
            records,
            request,
            has_more,
        }
    }
}

/// Trait for fetching per-company usage of a feature
///
/// Implementations can:
/// - Call a hosted entitlements API
/// - Serve fixture pages for tests
#[async_trait]
pub trait UsageFeed: Send + Sync {
    /// Fetch one page of usage records for a feature
    async fn fetch_page(&self, feature_id: &str, request: PageRequest) -> Result<UsagePage>;
}

// ============================================================================
// NotificationStateStore - Last observation per company
// ============================================================================

/// The usage and allocation last seen for a company
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageObservation {
    pub usage: f64,
    pub allocation: Allocation,
}

impl From<&UsageRecord> for UsageObservation {
    fn from(record: &UsageRecord) -> Self {
        Self {
            usage: record.usage,
            allocation: record.allocation,
        }
    }
}

/// Trait for remembering the last observation of each company
///
/// Observations are namespaced by feature: the same company watched under two
/// features has two independent histories. Entries are created on first
/// observation and overwritten every cycle. There is no expiry.
#[async_trait]
pub trait NotificationStateStore: Send + Sync {
    /// Last observation for a company under a feature, if it was ever seen
    async fn get(&self, feature_id: &str, company_id: &str) -> Option<UsageObservation>;

    /// Record the latest observation for a company under a feature
    async fn set(&self, feature_id: &str, company_id: &str, observation: UsageObservation);

    /// Record observations for many companies under one feature
    async fn set_many(&self, feature_id: &str, observations: Vec<(String, UsageObservation)>) {
        for (company_id, observation) in observations {
            self.set(feature_id, &company_id, observation).await;
        }
    }

    /// Number of tracked (feature, company) pairs
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

// ============================================================================
// NotificationDispatcher - Delivery of notification events
// ============================================================================

/// Trait for delivering notification events
///
/// `deliver` never fails: transport and status errors are captured in the
/// returned [`DeliveryOutcome`].
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Name of this dispatcher (for logging)
    fn name(&self) -> &'static str;

    /// Whether deliveries leave the process
    fn is_enabled(&self) -> bool;

    /// Deliver one event
    async fn deliver(&self, event: &NotificationEvent) -> DeliveryOutcome;
}

/// A dispatcher that reports success without sending anything
pub struct NoopDispatcher;

#[async_trait]
impl NotificationDispatcher for NoopDispatcher {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn deliver(&self, event: &NotificationEvent) -> DeliveryOutcome {
        DeliveryOutcome::success(event.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_page_request_next() {
        let page = PageRequest::first(100);
        assert_eq!(page.next(), PageRequest::new(100, 100));
        assert_eq!(PageRequest::new(0, 0).limit, 1);
    }

    #[test]
    fn test_inferred_has_more() {
        let request = PageRequest::first(2);
        assert!(!UsagePage::inferred(vec![], request).has_more);
    }

    #[tokio::test]
    async fn test_noop_dispatcher() {
        let dispatcher = NoopDispatcher;
        assert!(!dispatcher.is_enabled());
        assert_eq!(dispatcher.name(), "noop");

        let event = NotificationEvent {
            company_id: "c".to_string(),
            company_name: "C".to_string(),
            feature_name: "f".to_string(),
            threshold: 80,
            usage: 80.0,
            allocation: Allocation::Limited(100.0),
            timestamp: Utc::now(),
        };
        let outcome = dispatcher.deliver(&event).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.event, event);
    }
}
