//! Metrics collection and exposition.
//!
//! # Metrics
//! - `web_requests_total` (counter): requests by service, method, status
//! - `web_request_duration_seconds` (histogram): latency distribution

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install metrics exporter: {e}"))?;
    tracing::info!(%addr, "metrics scrape endpoint listening");
    Ok(())
}

/// Record one completed request.
pub fn record_request(service: &'static str, method: &str, status: u16, started: Instant) {
    metrics::counter!(
        "web_requests_total",
        "service" => service,
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    metrics::histogram!(
        "web_request_duration_seconds",
        "service" => service,
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .record(started.elapsed().as_secs_f64());
}

/// Per-request metrics stage.
#[derive(Clone)]
pub struct MetricsStage {
    pub service: &'static str,
}

pub async fn record_request_metrics(
    State(stage): State<MetricsStage>,
    req: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = req.method().to_string();
    let response = next.run(req).await;
    record_request(stage.service, &method, response.status().as_u16(), started);
    response
}
