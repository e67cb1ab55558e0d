//! Observability subsystem.
//!
//! Log output and span export live in [`crate::telemetry`]; this module owns
//! the request metrics and their Prometheus exposition. Metric updates are
//! cheap atomic operations, so the per-request stage sits near the outside
//! of the pipeline and sees every request, including static assets.

pub mod metrics;

pub use metrics::{init_metrics, record_request, record_request_metrics, MetricsStage};
