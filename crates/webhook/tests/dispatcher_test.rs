// Integration tests for WebhookDispatcher against a mock endpoint
//
// Run with: cargo test -p quotawatch-webhook --test dispatcher_test

use chrono::Utc;
use quotawatch_core::{Allocation, DeliveryStatus, NotificationDispatcher, NotificationEvent};
use quotawatch_webhook::WebhookDispatcher;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn event() -> NotificationEvent {
    NotificationEvent {
        company_id: "comp_1".to_string(),
        company_name: "Acme".to_string(),
        feature_name: "API Calls".to_string(),
        threshold: 80,
        usage: 85.0,
        allocation: Allocation::Limited(100.0),
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn test_posts_event_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/usage"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(serde_json::json!({
            "companyId": "comp_1",
            "companyName": "Acme",
            "featureName": "API Calls",
            "threshold": 80,
            "usage": 85.0,
            "allocation": 100.0
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = WebhookDispatcher::new(Some(format!("{}/hooks/usage", server.uri())));
    let outcome = dispatcher.deliver(&event()).await;

    assert_eq!(outcome.status, DeliveryStatus::Success);
    assert!(outcome.error_detail.is_none());
    assert_eq!(outcome.event.threshold, 80);
}

#[tokio::test]
async fn test_non_2xx_is_error_outcome() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = WebhookDispatcher::new(Some(server.uri()));
    let outcome = dispatcher.deliver(&event()).await;

    assert_eq!(outcome.status, DeliveryStatus::Error);
    assert_eq!(
        outcome.error_detail.as_deref(),
        Some("HTTP 503: Service Unavailable")
    );
}

#[tokio::test]
async fn test_network_failure_is_error_outcome() {
    // Nothing listens on the discard port
    let dispatcher = WebhookDispatcher::new(Some("http://127.0.0.1:9/hook".to_string()));
    let outcome = dispatcher.deliver(&event()).await;

    assert_eq!(outcome.status, DeliveryStatus::Error);
    assert!(outcome.error_detail.is_some());
}

#[tokio::test]
async fn test_unset_url_succeeds_without_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dispatcher = WebhookDispatcher::new(None);
    for _ in 0..3 {
        let outcome = dispatcher.deliver(&event()).await;
        assert!(outcome.is_success());
    }
}
