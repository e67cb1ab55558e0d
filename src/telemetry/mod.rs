//! Tracing and span export.
//!
//! Structured logging always goes through `tracing` with an environment
//! filter. Span export is opt-in: the exporter selector names a backend and
//! the matching collector endpoint must be configured, otherwise startup
//! fails rather than silently dropping spans. All three backends are fed
//! over OTLP; Jaeger and Zipkin ingest it natively.

use std::sync::Once;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{Protocol, SpanExporter, WithExportConfig};
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::schema::TelemetryConfig;
use crate::config::AppConfig;

const EXPORT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("exporter selected but {0} is not configured")]
    MissingEndpoint(&'static str),

    #[error("failed to build span exporter: {0}")]
    Exporter(String),
}

/// Supported span export backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExporterKind {
    Jaeger,
    Zipkin,
    Otlp,
}

impl ExporterKind {
    /// Case-insensitive parse of the selector value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "jaeger" => Some(ExporterKind::Jaeger),
            "zipkin" => Some(ExporterKind::Zipkin),
            "otlp" => Some(ExporterKind::Otlp),
            _ => None,
        }
    }
}

/// Resolve the configured exporter. Empty means export is disabled; an
/// unknown value is logged and treated as disabled.
pub fn resolve_exporter(config: &TelemetryConfig) -> Option<ExporterKind> {
    let value = config.use_exporter.trim();
    if value.is_empty() {
        return None;
    }
    match ExporterKind::parse(value) {
        Some(kind) => Some(kind),
        None => {
            tracing::warn!(selector = value, "unknown exporter selector, span export disabled");
            None
        }
    }
}

fn endpoint_for(kind: ExporterKind, config: &TelemetryConfig) -> Result<&str, TelemetryError> {
    let (endpoint, key) = match kind {
        ExporterKind::Otlp => (&config.otlp_endpoint, "Otlp:Endpoint"),
        ExporterKind::Jaeger => (&config.jaeger_endpoint, "Jaeger:Endpoint"),
        ExporterKind::Zipkin => (&config.zipkin_endpoint, "Zipkin:Endpoint"),
    };
    endpoint
        .as_deref()
        .ok_or(TelemetryError::MissingEndpoint(key))
}

static INSECURE_TRANSPORT: Once = Once::new();

/// Allow plaintext gRPC export. Returns true only on the call that actually
/// performed the registration; subsequent calls are no-ops.
pub fn register_insecure_transport() -> bool {
    let mut registered = false;
    INSECURE_TRANSPORT.call_once(|| {
        registered = true;
        tracing::debug!("insecure gRPC transport registered for span export");
    });
    registered
}

fn build_exporter(
    kind: ExporterKind,
    config: &TelemetryConfig,
) -> Result<SpanExporter, TelemetryError> {
    let endpoint = endpoint_for(kind, config)?;

    match kind {
        // Jaeger's collector ingests OTLP over gRPC on its 4317 port.
        ExporterKind::Otlp | ExporterKind::Jaeger => {
            if endpoint.starts_with("http://") {
                register_insecure_transport();
            }
            SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .with_timeout(EXPORT_TIMEOUT)
                .build()
                .map_err(|e| TelemetryError::Exporter(e.to_string()))
        }
        // Zipkin only speaks HTTP; use the binary OTLP encoding.
        ExporterKind::Zipkin => SpanExporter::builder()
            .with_http()
            .with_protocol(Protocol::HttpBinary)
            .with_endpoint(endpoint)
            .with_timeout(EXPORT_TIMEOUT)
            .build()
            .map_err(|e| TelemetryError::Exporter(e.to_string())),
    }
}

fn build_otel_layer<S>(
    kind: ExporterKind,
    config: &AppConfig,
) -> Result<impl Layer<S>, TelemetryError>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let exporter = build_exporter(kind, &config.telemetry)?;
    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder_empty()
                .with_attributes([
                    KeyValue::new("service.name", config.host.service_name()),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                ])
                .build(),
        )
        .build();

    let tracer = provider.tracer(config.host.service_name());
    global::set_tracer_provider(provider);
    Ok(tracing_opentelemetry::layer().with_tracer(tracer))
}

/// Install the global subscriber: env-filtered fmt output, plus a span export
/// layer when an exporter is selected.
pub fn init(config: &AppConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("shopfront=debug,tower_http=debug"));
    let fmt = tracing_subscriber::fmt::layer().with_target(true);

    let selected = resolve_exporter(&config.telemetry);
    let otel = match selected {
        Some(kind) => Some(build_otel_layer(kind, config)?),
        None => None,
    };

    Registry::default().with(filter).with(fmt).with(otel).init();

    if let Some(kind) = selected {
        tracing::info!(exporter = ?kind, service = config.host.service_name(), "span export enabled");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_parse_is_case_insensitive() {
        assert_eq!(ExporterKind::parse("Jaeger"), Some(ExporterKind::Jaeger));
        assert_eq!(ExporterKind::parse("ZIPKIN"), Some(ExporterKind::Zipkin));
        assert_eq!(ExporterKind::parse("otlp"), Some(ExporterKind::Otlp));
        assert_eq!(ExporterKind::parse("wavefront"), None);
    }

    #[test]
    fn empty_and_unknown_selectors_disable_export() {
        let mut config = TelemetryConfig::default();
        assert!(resolve_exporter(&config).is_none());

        config.use_exporter = "  ".to_string();
        assert!(resolve_exporter(&config).is_none());

        config.use_exporter = "wavefront".to_string();
        assert!(resolve_exporter(&config).is_none());
    }

    #[test]
    fn selected_exporter_without_an_endpoint_is_fatal() {
        let config = TelemetryConfig {
            use_exporter: "otlp".to_string(),
            ..TelemetryConfig::default()
        };
        let err = build_exporter(ExporterKind::Otlp, &config).unwrap_err();
        assert!(matches!(err, TelemetryError::MissingEndpoint("Otlp:Endpoint")));

        let err = build_exporter(ExporterKind::Jaeger, &config).unwrap_err();
        assert!(matches!(err, TelemetryError::MissingEndpoint("Jaeger:Endpoint")));
    }

    #[test]
    fn zipkin_exporter_builds_against_an_http_endpoint() {
        let config = TelemetryConfig {
            use_exporter: "zipkin".to_string(),
            zipkin_endpoint: Some("http://localhost:9411/api/v2/spans".to_string()),
            ..TelemetryConfig::default()
        };
        assert!(build_exporter(ExporterKind::Zipkin, &config).is_ok());
    }

    #[test]
    fn insecure_transport_registers_exactly_once() {
        // Another test may have registered first; either way, once the first
        // call here returns the registration is complete and later calls
        // must report they did nothing.
        let _ = register_insecure_transport();
        assert!(!register_insecure_transport());
        assert!(!register_insecure_transport());
    }
}
