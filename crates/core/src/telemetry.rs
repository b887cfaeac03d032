// Telemetry Module
//
// Tracing setup shared by the QuotaWatch binaries. Console logging through
// tracing-subscriber is always on; spans are also exported over OTLP when
// an endpoint is configured. Cycle spans carry `otel.name`.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
    Resource,
};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// ============================================================================
// Span naming
// ============================================================================

/// Span name for one polling cycle
///
/// Format: `poll_usage {feature_id}`
pub fn cycle_span_name(feature_id: &str) -> String {
    format!("poll_usage {}", feature_id)
}

// ============================================================================
// Telemetry Configuration
// ============================================================================

const DEFAULT_LOG_FILTER: &str = "info";

/// Configuration for logging and OpenTelemetry
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for traces
    pub service_name: String,
    /// Service version reported as `service.version`
    pub service_version: String,
    /// OTLP endpoint (e.g., "http://localhost:4317"); export is off when unset
    pub otlp_endpoint: Option<String>,
    /// Deployment environment (e.g., "production")
    pub environment: Option<String>,
    /// Log filter (e.g., "info", "quotawatch_worker=debug")
    pub log_filter: String,
}

impl TelemetryConfig {
    /// Configuration for one binary, overridable from the environment
    ///
    /// Environment variables:
    /// - `OTEL_SERVICE_NAME`: replaces `service_name`
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint
    /// - `OTEL_ENVIRONMENT`: Deployment environment
    /// - `RUST_LOG` or `LOG_LEVEL`: replaces `log_filter`
    pub fn for_service(service_name: &str, service_version: &str, log_filter: &str) -> Self {
        Self {
            service_name: std::env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| service_name.to_string()),
            service_version: service_version.to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|endpoint| !endpoint.trim().is_empty()),
            environment: std::env::var("OTEL_ENVIRONMENT").ok(),
            log_filter: std::env::var("RUST_LOG")
                .or_else(|_| std::env::var("LOG_LEVEL"))
                .unwrap_or_else(|_| log_filter.to_string()),
        }
    }

    fn resource(&self) -> Resource {
        let mut attributes = vec![
            KeyValue::new("service.name", self.service_name.clone()),
            KeyValue::new("service.version", self.service_version.clone()),
        ];
        if let Some(env) = &self.environment {
            attributes.push(KeyValue::new("deployment.environment", env.clone()));
        }
        Resource::builder().with_attributes(attributes).build()
    }

    /// Falls back to `info` when the filter does not parse
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

// ============================================================================
// Initialization
// ============================================================================

/// Flushes and shuts down the tracer provider when dropped
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shutdown tracer provider: {:?}", e);
            }
        }
    }
}

/// Install the global subscriber: console output always, OTLP export when
/// an endpoint is configured
///
/// Keep the returned guard alive for the lifetime of the binary.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryGuard {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(config.env_filter());

    let otlp = config
        .otlp_endpoint
        .as_deref()
        .map(|endpoint| (endpoint, build_otlp_tracer(endpoint, config.resource())));

    let (provider, otel_layer) = match &otlp {
        Some((_, Ok((provider, tracer)))) => (
            Some(provider.clone()),
            Some(tracing_opentelemetry::layer().with_tracer(tracer.clone())),
        ),
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(otel_layer)
        .init();

    match otlp {
        Some((endpoint, Ok(_))) => {
            tracing::info!(endpoint = %endpoint, "OpenTelemetry tracing enabled");
        }
        Some((endpoint, Err(e))) => {
            tracing::warn!(endpoint = %endpoint, error = %e, "Failed to initialize OTLP tracer, continuing without export");
        }
        None => tracing::debug!("OTLP export disabled"),
    }

    TelemetryGuard { provider }
}

fn build_otlp_tracer(
    endpoint: &str,
    resource: Resource,
) -> Result<(SdkTracerProvider, opentelemetry_sdk::trace::Tracer), opentelemetry::trace::TraceError>
{
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(10))
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .build();

    let tracer = provider.tracer("quotawatch");

    Ok((provider, tracer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_span_name() {
        assert_eq!(cycle_span_name("feat_123"), "poll_usage feat_123");
    }

    #[test]
    fn test_unparseable_filter_falls_back_to_info() {
        let config = TelemetryConfig {
            service_name: "quotawatch-worker".to_string(),
            service_version: "0.1.0".to_string(),
            otlp_endpoint: None,
            environment: None,
            log_filter: "quotawatch_worker=loud".to_string(),
        };

        assert_eq!(config.env_filter().to_string(), "info");
    }
}
