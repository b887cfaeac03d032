// Usage Monitoring Core
//
// This crate provides the storage- and transport-agnostic pieces of the usage
// notification engine (fetch → evaluate → dispatch → commit).
//
// Key design decisions:
// - Threshold evaluation is a pure function; the caller owns the state update
// - Uses traits (UsageFeed, NotificationStateStore, NotificationDispatcher) for pluggable backends
// - State is an explicit store object owned by one poller, never a process global
// - Domain types serialize in camelCase to match the webhook wire format

pub mod activity_log;
pub mod error;
pub mod notification;
pub mod snapshot;
pub mod thresholds;
pub mod traits;
pub mod usage;

// Telemetry (tracing subscriber + optional OTLP export)
pub mod telemetry;

// In-memory implementations for tests and local runs
pub mod memory;

// Re-exports for convenience
pub use activity_log::{WebhookActivityLog, WebhookLogEntry, DEFAULT_LOG_CAPACITY};
pub use error::{FeedError, Result};
pub use notification::{DeliveryOutcome, DeliveryStatus, NotificationEvent};
pub use snapshot::{UsageSnapshot, UsageView};
pub use thresholds::{ThresholdEvaluator, ThresholdSet, DEFAULT_THRESHOLDS};
pub use traits::{
    NoopDispatcher, NotificationDispatcher, NotificationStateStore, PageRequest, UsageFeed,
    UsageObservation, UsagePage, DEFAULT_PAGE_SIZE,
};
pub use usage::{
    sort_by_utilization, usage_percentage, Allocation, UsageLevel, UsagePeriod, UsageRecord,
};
