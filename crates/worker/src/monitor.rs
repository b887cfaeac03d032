//! Usage monitor - one polling cycle
//!
//! A cycle walks FETCHING → EVALUATING → DISPATCHING → commit:
//!
//! ```text
//!  UsageFeed ──pages──▶ records ──▶ ThresholdEvaluator ──events──▶ NotificationDispatcher
//!                          │              ▲                               │
//!                          │              │ previous observation          │ outcomes
//!                          ▼              │                               ▼
//!                   NotificationStateStore ◀──────── commit ──── WebhookActivityLog
//! ```
//!
//! A fetch failure aborts the cycle before anything is evaluated, so no
//! company's state advances. Otherwise every fetched company is committed once
//! all of the cycle's deliveries have resolved, whether they succeeded or not.
//! Delivery outcomes reach the activity log at commit time, so a cycle
//! superseded by a feature change leaves no log entries.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::RwLock;
use quotawatch_core::telemetry::cycle_span_name;
use quotawatch_core::{
    DeliveryOutcome, FeedError, NotificationDispatcher, NotificationEvent,
    NotificationStateStore, PageRequest, ThresholdEvaluator, ThresholdSet, UsageFeed,
    UsageObservation, UsageRecord, UsageSnapshot, WebhookActivityLog, DEFAULT_PAGE_SIZE,
};
use serde::Serialize;
use tracing::{debug, info, warn, Instrument};

use crate::config::MonitorConfig;
use crate::error::PollerError;

/// What started a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleTrigger {
    /// The fixed polling interval elapsed
    Interval,
    /// A caller asked for a refresh
    Manual,
    /// The monitored feature changed
    FeatureChange,
}

impl std::fmt::Display for CycleTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleTrigger::Interval => write!(f, "interval"),
            CycleTrigger::Manual => write!(f, "manual"),
            CycleTrigger::FeatureChange => write!(f, "feature_change"),
        }
    }
}

/// Summary of a completed cycle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub feature_id: String,
    pub trigger: CycleTrigger,
    pub pages_fetched: usize,
    pub records_fetched: usize,
    /// Distinct companies evaluated (and committed)
    pub companies_evaluated: usize,
    pub events: Vec<NotificationEvent>,
    pub outcomes: Vec<DeliveryOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    pub fn failed_deliveries(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

/// All pages of one feature, merged
#[derive(Debug, Clone)]
pub struct FetchedUsage {
    pub records: Vec<UsageRecord>,
    pub pages: usize,
}

/// Runs fetch → evaluate → dispatch → commit cycles against injected collaborators
pub struct UsageMonitor {
    feed: Arc<dyn UsageFeed>,
    state: Arc<dyn NotificationStateStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    evaluator: ThresholdEvaluator,
    page_size: usize,
    max_pages: Option<usize>,
    activity_log: WebhookActivityLog,
    snapshot: RwLock<UsageSnapshot>,
}

impl UsageMonitor {
    pub fn new(
        feed: Arc<dyn UsageFeed>,
        state: Arc<dyn NotificationStateStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            feed,
            state,
            dispatcher,
            evaluator: ThresholdEvaluator::default(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: None,
            activity_log: WebhookActivityLog::new(),
            snapshot: RwLock::new(UsageSnapshot::default()),
        }
    }

    /// Apply paging and threshold settings
    pub fn configured(self, config: &MonitorConfig) -> Self {
        self.with_page_size(config.page_size)
            .with_max_pages(config.max_pages)
            .with_thresholds(config.thresholds.clone())
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages.map(|m| m.max(1));
        self
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdSet) -> Self {
        self.evaluator = ThresholdEvaluator::new(thresholds);
        self
    }

    pub fn with_activity_log(mut self, activity_log: WebhookActivityLog) -> Self {
        self.activity_log = activity_log;
        self
    }

    pub fn feed(&self) -> &Arc<dyn UsageFeed> {
        &self.feed
    }

    pub fn state(&self) -> &Arc<dyn NotificationStateStore> {
        &self.state
    }

    pub fn dispatcher(&self) -> &Arc<dyn NotificationDispatcher> {
        &self.dispatcher
    }

    pub fn activity_log(&self) -> &WebhookActivityLog {
        &self.activity_log
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Copy of the latest usage snapshot
    pub fn snapshot(&self) -> UsageSnapshot {
        self.snapshot.read().clone()
    }

    /// Run a cycle with no feature-change guard
    pub async fn run_cycle(
        &self,
        feature_id: &str,
        trigger: CycleTrigger,
    ) -> Result<CycleReport, PollerError> {
        self.run_guarded(feature_id, trigger, || true).await
    }

    /// Run a cycle, discarding its results if `still_current` turns false
    ///
    /// The guard is checked after fetching and again right before commit.
    pub async fn run_guarded<F>(
        &self,
        feature_id: &str,
        trigger: CycleTrigger,
        still_current: F,
    ) -> Result<CycleReport, PollerError>
    where
        F: Fn() -> bool + Send + Sync,
    {
        let span = tracing::info_span!(
            "poll_usage",
            otel.name = %cycle_span_name(feature_id),
            feature_id = %feature_id,
            trigger = %trigger,
        );

        self.cycle(feature_id, trigger, still_current)
            .instrument(span)
            .await
    }

    async fn cycle<F>(
        &self,
        feature_id: &str,
        trigger: CycleTrigger,
        still_current: F,
    ) -> Result<CycleReport, PollerError>
    where
        F: Fn() -> bool + Send + Sync,
    {
        let started_at = Utc::now();

        // FETCHING
        let fetched = match self.fetch_all(feature_id).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(error = %e, "Usage fetch failed, cycle aborted");
                if still_current() {
                    self.snapshot.write().apply_failure(feature_id, e.to_string());
                }
                return Err(PollerError::Fetch(e));
            }
        };

        if !still_current() {
            debug!("Feature changed during fetch, discarding results");
            return Err(PollerError::superseded(feature_id));
        }

        let records_fetched = fetched.records.len();
        let records = unique_companies(fetched.records);

        // EVALUATING
        let events = self.evaluate(feature_id, &records, Utc::now()).await;

        // DISPATCHING
        let outcomes = self.dispatch(&events).await;

        // Commit
        if !still_current() {
            debug!("Feature changed during dispatch, discarding results");
            return Err(PollerError::superseded(feature_id));
        }
        for outcome in &outcomes {
            self.activity_log.record(outcome);
        }
        self.commit(feature_id, &records).await;

        let finished_at = Utc::now();
        self.snapshot
            .write()
            .apply_success(feature_id, records.clone(), finished_at);

        let report = CycleReport {
            feature_id: feature_id.to_string(),
            trigger,
            pages_fetched: fetched.pages,
            records_fetched,
            companies_evaluated: records.len(),
            events,
            outcomes,
            started_at,
            finished_at,
        };

        info!(
            pages = report.pages_fetched,
            companies = report.companies_evaluated,
            notifications = report.events.len(),
            failed_deliveries = report.failed_deliveries(),
            "Polling cycle completed"
        );

        Ok(report)
    }

    /// Fetch pages until the feed reports no more or the page cap is reached
    ///
    /// Also stops at a page that brings no company not already seen, which
    /// is what a feed ignoring `offset` looks like.
    pub async fn fetch_all(&self, feature_id: &str) -> Result<FetchedUsage, FeedError> {
        let mut request = PageRequest::first(self.page_size);
        let mut records = Vec::new();
        let mut companies = HashSet::new();
        let mut pages = 0;

        loop {
            let page = self.feed.fetch_page(feature_id, request).await?;
            pages += 1;

            let has_more = page.has_more && !page.records.is_empty();
            let new_companies = page
                .records
                .iter()
                .filter(|r| companies.insert(r.company_id.clone()))
                .count();
            records.extend(page.records);

            if !has_more {
                break;
            }
            if new_companies == 0 {
                warn!(
                    pages,
                    offset = request.offset,
                    "Page repeated known companies only, stopping early"
                );
                break;
            }
            if self.max_pages.is_some_and(|max| pages >= max) {
                debug!(pages, "Page cap reached, stopping early");
                break;
            }
            request = request.next();
        }

        debug!(pages, records = records.len(), "Fetched usage");
        Ok(FetchedUsage { records, pages })
    }

    /// Evaluate every record against its last observation under `feature_id`
    pub async fn evaluate(
        &self,
        feature_id: &str,
        records: &[UsageRecord],
        observed_at: DateTime<Utc>,
    ) -> Vec<NotificationEvent> {
        let mut events = Vec::new();

        for record in records {
            let previous = self.state.get(feature_id, &record.company_id).await;
            if let Some(event) = self.evaluator.evaluate(record, previous.as_ref(), observed_at) {
                info!(
                    company_id = %event.company_id,
                    threshold = event.threshold,
                    usage = event.usage,
                    "Usage threshold crossed"
                );
                events.push(event);
            }
        }

        events
    }

    /// Deliver all events concurrently; resolves once every delivery has
    async fn dispatch(&self, events: &[NotificationEvent]) -> Vec<DeliveryOutcome> {
        if events.is_empty() {
            return Vec::new();
        }

        let outcomes = join_all(events.iter().map(|event| self.dispatcher.deliver(event))).await;

        for outcome in &outcomes {
            if outcome.is_success() {
                debug!(
                    dispatcher = self.dispatcher.name(),
                    company_id = %outcome.event.company_id,
                    threshold = outcome.event.threshold,
                    "Notification delivered"
                );
            } else {
                warn!(
                    dispatcher = self.dispatcher.name(),
                    company_id = %outcome.event.company_id,
                    threshold = outcome.event.threshold,
                    error = outcome.error_detail.as_deref().unwrap_or("unknown"),
                    "Notification delivery failed"
                );
            }
        }

        outcomes
    }

    async fn commit(&self, feature_id: &str, records: &[UsageRecord]) {
        let observations = records
            .iter()
            .map(|r| (r.company_id.clone(), UsageObservation::from(r)))
            .collect();
        self.state.set_many(feature_id, observations).await;
    }
}

/// Keep the first record of each company, preserving feed order
fn unique_companies(records: Vec<UsageRecord>) -> Vec<UsageRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.company_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotawatch_core::memory::{
        InMemoryNotificationStateStore, InMemoryUsageFeed, RecordingDispatcher,
    };
    use quotawatch_core::{Allocation, UsagePeriod};

    fn record(company_id: &str, usage: f64) -> UsageRecord {
        UsageRecord {
            company_id: company_id.to_string(),
            company_name: company_id.to_uppercase(),
            plan_name: None,
            feature_id: "feat_1".to_string(),
            feature_name: "API Calls".to_string(),
            period: UsagePeriod::CurrentMonth,
            usage,
            allocation: Allocation::Limited(100.0),
        }
    }

    fn monitor(feed: &InMemoryUsageFeed, state: &InMemoryNotificationStateStore) -> UsageMonitor {
        UsageMonitor::new(
            Arc::new(feed.clone()),
            Arc::new(state.clone()),
            Arc::new(RecordingDispatcher::new()),
        )
    }

    #[test]
    fn test_unique_companies_keeps_first() {
        let records = vec![record("a", 1.0), record("b", 2.0), record("a", 99.0)];
        let unique = unique_companies(records);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].usage, 1.0);
    }

    #[test]
    fn test_trigger_display() {
        assert_eq!(CycleTrigger::FeatureChange.to_string(), "feature_change");
    }

    #[tokio::test]
    async fn test_fetch_all_merges_pages() {
        let feed = InMemoryUsageFeed::new();
        feed.set_records("feat_1", (0..5).map(|i| record(&format!("c{}", i), 1.0)).collect());
        let state = InMemoryNotificationStateStore::new();

        let fetched = monitor(&feed, &state)
            .with_page_size(2)
            .fetch_all("feat_1")
            .await
            .unwrap();

        assert_eq!(fetched.records.len(), 5);
        assert_eq!(fetched.pages, 3);
        let offsets: Vec<_> = feed.requests().iter().map(|(_, r)| r.offset).collect();
        assert_eq!(offsets, vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn test_fetch_all_exact_multiple_requests_empty_page() {
        let feed = InMemoryUsageFeed::new();
        feed.set_records("feat_1", (0..4).map(|i| record(&format!("c{}", i), 1.0)).collect());
        let state = InMemoryNotificationStateStore::new();

        let fetched = monitor(&feed, &state)
            .with_page_size(2)
            .fetch_all("feat_1")
            .await
            .unwrap();

        assert_eq!(fetched.records.len(), 4);
        assert_eq!(fetched.pages, 3);
    }

    #[tokio::test]
    async fn test_fetch_all_respects_page_cap() {
        let feed = InMemoryUsageFeed::new();
        feed.set_records("feat_1", (0..10).map(|i| record(&format!("c{}", i), 1.0)).collect());
        let state = InMemoryNotificationStateStore::new();

        let fetched = monitor(&feed, &state)
            .with_page_size(2)
            .with_max_pages(Some(2))
            .fetch_all("feat_1")
            .await
            .unwrap();

        assert_eq!(fetched.records.len(), 4);
        assert_eq!(fetched.pages, 2);
    }

    #[tokio::test]
    async fn test_evaluate_does_not_touch_state() {
        let feed = InMemoryUsageFeed::new();
        let state = InMemoryNotificationStateStore::new();
        let monitor = monitor(&feed, &state);

        let events = monitor
            .evaluate("feat_1", &[record("a", 95.0)], Utc::now())
            .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].threshold, 90);
        assert!(state.is_empty().await);
    }
}
