use std::sync::Arc;

use anyhow::{Context, Result};
use quotawatch_core::memory::InMemoryNotificationStateStore;
use quotawatch_core::telemetry::{init_telemetry, TelemetryConfig};
use quotawatch_schematic::SchematicFeed;
use quotawatch_webhook::WebhookDispatcher;
use quotawatch_worker::{MonitorConfig, UsageMonitor, UsagePoller};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    // Configure via environment variables:
    // - OTEL_SERVICE_NAME: Service name (default: "quotawatch-worker")
    // - OTEL_EXPORTER_OTLP_ENDPOINT: OTLP endpoint (e.g., "http://localhost:4317")
    // - RUST_LOG or LOG_LEVEL: Log filter (default: "quotawatch_worker=info")
    let telemetry_config = TelemetryConfig::for_service(
        "quotawatch-worker",
        env!("CARGO_PKG_VERSION"),
        "quotawatch_worker=info,quotawatch_webhook=info",
    );

    // Keep the guard alive for the lifetime of the application
    let _telemetry_guard = init_telemetry(&telemetry_config);

    tracing::info!("quotawatch-worker starting...");

    let config = MonitorConfig::from_env().context("Invalid monitor configuration")?;
    let feature_id = config
        .feature_id
        .clone()
        .context("FEATURE_ID environment variable required")?;
    let feed = SchematicFeed::from_env().context("Failed to create usage feed client")?;
    let dispatcher = WebhookDispatcher::from_env();

    if !feed.has_credentials() {
        tracing::warn!("SCHEMATIC_API_KEY not set, every fetch will fail until it is configured");
    }
    if dispatcher.url().is_none() {
        tracing::info!("WEBHOOK_URL not set, notifications will not be delivered");
    }

    tracing::info!(
        feature_id = %feature_id,
        poll_interval_secs = config.poll_interval.as_secs(),
        page_size = config.page_size,
        "Starting usage poller"
    );

    let monitor = UsageMonitor::new(
        Arc::new(feed),
        Arc::new(InMemoryNotificationStateStore::new()),
        Arc::new(dispatcher),
    )
    .configured(&config);

    let (handle, task) = UsagePoller::spawn(Arc::new(monitor), config);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Received shutdown signal");

    handle.shutdown();
    task.await.context("Poller task panicked")?;

    tracing::info!("Worker shutdown complete");
    Ok(())
}
