// In-memory implementations for tests and local runs
//
// InMemoryNotificationStateStore is also the production state store; notification
// state lives as long as the process.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::error::{FeedError, Result};
use crate::notification::{DeliveryOutcome, NotificationEvent};
use crate::traits::{
    NotificationDispatcher, NotificationStateStore, PageRequest, UsageFeed, UsageObservation,
    UsagePage,
};
use crate::usage::UsageRecord;

// ============================================================================
// InMemoryNotificationStateStore
// ============================================================================

/// Process-lifetime map of feature → company → last observation
#[derive(Clone, Default)]
pub struct InMemoryNotificationStateStore {
    observations: Arc<RwLock<HashMap<String, HashMap<String, UsageObservation>>>>,
}

impl InMemoryNotificationStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with observations for one feature
    pub fn with_observations(
        feature_id: &str,
        observations: impl IntoIterator<Item = (String, UsageObservation)>,
    ) -> Self {
        let mut features = HashMap::new();
        features.insert(feature_id.to_string(), observations.into_iter().collect());
        Self {
            observations: Arc::new(RwLock::new(features)),
        }
    }

    /// Copy of the observations tracked for a feature
    pub fn snapshot(&self, feature_id: &str) -> HashMap<String, UsageObservation> {
        self.observations
            .read()
            .get(feature_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationStateStore for InMemoryNotificationStateStore {
    async fn get(&self, feature_id: &str, company_id: &str) -> Option<UsageObservation> {
        self.observations
            .read()
            .get(feature_id)
            .and_then(|companies| companies.get(company_id))
            .copied()
    }

    async fn set(&self, feature_id: &str, company_id: &str, observation: UsageObservation) {
        self.observations
            .write()
            .entry(feature_id.to_string())
            .or_default()
            .insert(company_id.to_string(), observation);
    }

    async fn set_many(&self, feature_id: &str, observations: Vec<(String, UsageObservation)>) {
        let mut guard = self.observations.write();
        let companies = guard.entry(feature_id.to_string()).or_default();
        for (company_id, observation) in observations {
            companies.insert(company_id, observation);
        }
    }

    async fn len(&self) -> usize {
        self.observations.read().values().map(HashMap::len).sum()
    }
}

// ============================================================================
// InMemoryUsageFeed
// ============================================================================

/// Usage feed serving fixture records, paginated like the real API
///
/// Individual offsets can be made to fail to exercise partial-fetch paths.
#[derive(Clone, Default)]
pub struct InMemoryUsageFeed {
    records: Arc<RwLock<HashMap<String, Vec<UsageRecord>>>>,
    failing_offsets: Arc<RwLock<HashSet<usize>>>,
    requests: Arc<Mutex<Vec<(String, PageRequest)>>>,
}

impl InMemoryUsageFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all records of a feature
    pub fn set_records(&self, feature_id: &str, records: Vec<UsageRecord>) {
        self.records.write().insert(feature_id.to_string(), records);
    }

    /// Make any page starting at `offset` fail with an API error
    pub fn fail_at_offset(&self, offset: usize) {
        self.failing_offsets.write().insert(offset);
    }

    /// Stop failing at any offset
    pub fn clear_failures(&self) {
        self.failing_offsets.write().clear();
    }

    /// Every page request received so far
    pub fn requests(&self) -> Vec<(String, PageRequest)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl UsageFeed for InMemoryUsageFeed {
    async fn fetch_page(&self, feature_id: &str, request: PageRequest) -> Result<UsagePage> {
        self.requests.lock().push((feature_id.to_string(), request));

        if self.failing_offsets.read().contains(&request.offset) {
            return Err(FeedError::api(500, "simulated feed failure"));
        }

        let page: Vec<UsageRecord> = self
            .records
            .read()
            .get(feature_id)
            .map(|records| {
                records
                    .iter()
                    .skip(request.offset)
                    .take(request.limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(UsagePage::inferred(page, request))
    }
}

// ============================================================================
// RecordingDispatcher
// ============================================================================

/// Dispatcher that records every event it is asked to deliver
///
/// Companies listed with [`RecordingDispatcher::fail_for`] receive an error
/// outcome instead of success.
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    delivered: Arc<Mutex<Vec<NotificationEvent>>>,
    failing_companies: Arc<RwLock<HashSet<String>>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail deliveries for one company
    pub fn fail_for(&self, company_id: &str) {
        self.failing_companies.write().insert(company_id.to_string());
    }

    /// Events delivered so far, in delivery order
    pub fn delivered(&self) -> Vec<NotificationEvent> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn deliver(&self, event: &NotificationEvent) -> DeliveryOutcome {
        self.delivered.lock().push(event.clone());

        if self.failing_companies.read().contains(&event.company_id) {
            DeliveryOutcome::error(event.clone(), "HTTP 500: Internal Server Error")
        } else {
            DeliveryOutcome::success(event.clone())
        }
    }
}
