// HTTP API routes
//
// This module contains all HTTP route handlers for the public API.
// Every route reads and drives the same running poller through ApiState.

pub mod common;
pub mod feature_usage;
pub mod notifications;
pub mod usage;
pub mod webhook_logs;

// Re-export common types
pub use common::{ErrorResponse, ListResponse};

use axum::Router;
use quotawatch_worker::PollerHandle;

/// App state shared by the API routes
#[derive(Clone)]
pub struct ApiState {
    pub poller: PollerHandle,
}

impl ApiState {
    pub fn new(poller: PollerHandle) -> Self {
        Self { poller }
    }
}

/// All `/v1` routes
pub fn routes(state: ApiState) -> Router {
    Router::new()
        .merge(feature_usage::routes(state.clone()))
        .merge(notifications::routes(state.clone()))
        .merge(usage::routes(state.clone()))
        .merge(webhook_logs::routes(state))
}
