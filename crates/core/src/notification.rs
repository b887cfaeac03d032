// Notification domain types
//
// A NotificationEvent is produced once per threshold crossing and is never
// mutated afterwards. A DeliveryOutcome records what happened when it was sent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::usage::Allocation;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// A company crossed a usage threshold since the previous observation.
///
/// This is also the JSON body POSTed to the webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub company_id: String,
    pub company_name: String,
    pub feature_name: String,
    /// The crossed threshold, in percent (100, 90 or 80).
    #[cfg_attr(feature = "openapi", schema(example = 90))]
    pub threshold: u32,
    pub usage: f64,
    /// Allocation at the time of the crossing; `null` means unlimited.
    #[cfg_attr(feature = "openapi", schema(value_type = Option<f64>))]
    pub allocation: Allocation,
    pub timestamp: DateTime<Utc>,
}

/// Result of a delivery attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Success,
    Error,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::Success => write!(f, "success"),
            DeliveryStatus::Error => write!(f, "error"),
        }
    }
}

/// What happened when a notification was delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    pub event: NotificationEvent,
    pub status: DeliveryStatus,
    /// Status code or transport error message when `status` is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl DeliveryOutcome {
    pub fn success(event: NotificationEvent) -> Self {
        Self {
            event,
            status: DeliveryStatus::Success,
            error_detail: None,
        }
    }

    pub fn error(event: NotificationEvent, detail: impl Into<String>) -> Self {
        Self {
            event,
            status: DeliveryStatus::Error,
            error_detail: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeliveryStatus::Success
    }
}
