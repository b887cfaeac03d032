// Webhook activity log
//
// Bounded, newest-first record of delivery outcomes for the dashboard.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notification::{DeliveryOutcome, DeliveryStatus};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Number of entries kept when no capacity is given
pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// One delivery attempt as shown in the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct WebhookLogEntry {
    pub id: Uuid,
    pub company_id: String,
    pub company_name: String,
    pub feature_name: String,
    pub threshold: u32,
    pub timestamp: DateTime<Utc>,
    pub status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&DeliveryOutcome> for WebhookLogEntry {
    fn from(outcome: &DeliveryOutcome) -> Self {
        Self {
            id: Uuid::now_v7(),
            company_id: outcome.event.company_id.clone(),
            company_name: outcome.event.company_name.clone(),
            feature_name: outcome.event.feature_name.clone(),
            threshold: outcome.event.threshold,
            timestamp: Utc::now(),
            status: outcome.status,
            error: outcome.error_detail.clone(),
        }
    }
}

/// Shared bounded log; clones share the same entries.
#[derive(Clone)]
pub struct WebhookActivityLog {
    entries: Arc<RwLock<VecDeque<WebhookLogEntry>>>,
    capacity: usize,
}

impl WebhookActivityLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Record an outcome; the oldest entry is dropped when full
    pub fn record(&self, outcome: &DeliveryOutcome) -> WebhookLogEntry {
        let entry = WebhookLogEntry::from(outcome);
        let mut entries = self.entries.write();
        entries.push_front(entry.clone());
        entries.truncate(self.capacity);
        entry
    }

    /// Entries, newest first
    pub fn entries(&self) -> Vec<WebhookLogEntry> {
        self.entries.read().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for WebhookActivityLog {
    fn default() -> Self {
        Self::new()
    }
}
