// Webhook Notification Dispatcher
//
// Delivers NotificationEvents as JSON POSTs to a configured URL.
// Key design decisions:
// - deliver() never fails; status and transport errors become error outcomes
// - No URL configured disables delivery: every event is reported as success
// - No retry and no signature scheme; delivery is best-effort

use async_trait::async_trait;
use quotawatch_core::{DeliveryOutcome, NotificationDispatcher, NotificationEvent};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, instrument, warn};

/// Dispatcher posting events to an HTTP endpoint
pub struct WebhookDispatcher {
    url: Option<String>,
    http: reqwest::Client,
}

impl WebhookDispatcher {
    /// Create a dispatcher; `None` or an empty URL disables delivery
    pub fn new(url: Option<String>) -> Self {
        let url = url.filter(|u| !u.trim().is_empty());

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("QuotaWatch-Webhook/1.0"));

        // Falls back to a default client if custom headers cannot be applied
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .unwrap_or_default();

        Self { url, http }
    }

    /// Create a dispatcher from `WEBHOOK_URL`
    pub fn from_env() -> Self {
        Self::new(std::env::var("WEBHOOK_URL").ok())
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    #[instrument(
        skip(self, event),
        fields(company_id = %event.company_id, threshold = event.threshold)
    )]
    async fn deliver(&self, event: &NotificationEvent) -> DeliveryOutcome {
        let Some(url) = self.url.as_deref() else {
            debug!("Webhook URL not configured, skipping delivery");
            return DeliveryOutcome::success(event.clone());
        };

        match self.http.post(url).json(event).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(status = response.status().as_u16(), "Webhook delivered");
                DeliveryOutcome::success(event.clone())
            }
            Ok(response) => {
                let status = response.status();
                let detail = format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown Status")
                );
                warn!(status = status.as_u16(), "Webhook endpoint rejected notification");
                DeliveryOutcome::error(event.clone(), detail)
            }
            Err(e) => {
                warn!(error = %e, "Webhook delivery failed");
                DeliveryOutcome::error(event.clone(), e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_url_disables() {
        assert!(!WebhookDispatcher::new(None).is_enabled());
        assert!(!WebhookDispatcher::new(Some("  ".to_string())).is_enabled());

        let enabled = WebhookDispatcher::new(Some("https://hooks.example.com/x".to_string()));
        assert!(enabled.is_enabled());
        assert_eq!(enabled.url(), Some("https://hooks.example.com/x"));
        assert_eq!(enabled.name(), "webhook");
    }
}
