pub mod config;
pub mod error;
pub mod monitor;
pub mod poller;

// Re-export main types
pub use config::{ConfigError, MonitorConfig, DEFAULT_POLL_INTERVAL};
pub use error::PollerError;
pub use monitor::{CycleReport, CycleTrigger, FetchedUsage, UsageMonitor};
pub use poller::{PollerHandle, UsagePoller};
