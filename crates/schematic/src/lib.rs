// Schematic Usage Feed
//
// Implements the UsageFeed trait against the Schematic entitlements API
// (`GET /feature-companies`). Key design decisions:
// - Pages are requested with explicit offset/limit; the API reports no total,
//   so `has_more` is inferred from a full page
// - Wire types are private to this crate and converted into core UsageRecords
// - Without an API key every fetch fails with MissingConfiguration

mod client;
mod config;
mod types;

pub use client::SchematicFeed;
pub use config::{SchematicConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
