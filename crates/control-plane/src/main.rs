// QuotaWatch API server
//
// Hosts the usage poller and exposes it over HTTP.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use quotawatch_control_plane::{app, ApiState};
use quotawatch_core::memory::InMemoryNotificationStateStore;
use quotawatch_core::telemetry::{init_telemetry, TelemetryConfig};
use quotawatch_schematic::SchematicFeed;
use quotawatch_webhook::WebhookDispatcher;
use quotawatch_worker::{MonitorConfig, UsageMonitor, UsagePoller};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Configure via environment variables:
    // - OTEL_SERVICE_NAME: Service name (default: "quotawatch-control-plane")
    // - OTEL_EXPORTER_OTLP_ENDPOINT: OTLP endpoint (e.g., "http://localhost:4317")
    // - RUST_LOG: Log filter (default: "quotawatch_control_plane=debug,quotawatch_worker=info,tower_http=debug")
    let telemetry_config = TelemetryConfig::for_service(
        "quotawatch-control-plane",
        env!("CARGO_PKG_VERSION"),
        "quotawatch_control_plane=debug,quotawatch_worker=info,tower_http=debug",
    );

    // Keep the guard alive for the lifetime of the application
    let _telemetry_guard = init_telemetry(&telemetry_config);

    tracing::info!("quotawatch-api starting...");

    let config = MonitorConfig::from_env().context("Invalid monitor configuration")?;
    let feed = SchematicFeed::from_env().context("Failed to create usage feed client")?;
    let dispatcher = WebhookDispatcher::from_env();

    if !feed.has_credentials() {
        tracing::warn!("SCHEMATIC_API_KEY not set, usage requests will be rejected");
    }
    if dispatcher.url().is_none() {
        tracing::info!("WEBHOOK_URL not set, notifications will not be delivered");
    }

    let monitor = UsageMonitor::new(
        Arc::new(feed),
        Arc::new(InMemoryNotificationStateStore::new()),
        Arc::new(dispatcher),
    )
    .configured(&config);

    tracing::info!(
        feature_id = ?config.feature_id,
        poll_interval_secs = config.poll_interval.as_secs(),
        "Starting usage poller"
    );
    let (poller, poller_task) = UsagePoller::spawn(Arc::new(monitor), config);

    // Load CORS allowed origins from environment (optional)
    // Example: CORS_ALLOWED_ORIGINS="https://app.example.com,https://admin.example.com"
    let cors_origins: Vec<HeaderValue> = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .filter(|s| !s.is_empty())
        .map(|s| s.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();

    if cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?cors_origins, "CORS origins configured");
    }

    let app = app(ApiState::new(poller.clone()));

    // Add CORS layer only if origins are configured
    let app = if !cors_origins.is_empty() {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN]),
        )
    } else {
        app
    };

    // Add tracing
    let app = app.layer(TraceLayer::new_for_http());

    let port: u16 = match std::env::var("PORT") {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid PORT value '{}'", value))?,
        Err(_) => 9000,
    };
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("HTTP server listening on {}", addr);

    let shutdown_poller = poller.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Received shutdown signal");
            shutdown_poller.shutdown();
        })
        .await
        .context("Server error")?;

    poller.shutdown();
    poller_task.await.context("Poller task panicked")?;

    tracing::info!("Control plane shutdown complete");
    Ok(())
}
