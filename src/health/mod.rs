//! Health checks.
//!
//! Two surfaces with deliberately different meanings: the liveness probe
//! answers "is this process responsive" and runs the self check only, while
//! the aggregate endpoint also probes remote dependencies. A cluster
//! orchestrator must never restart a host because the identity authority is
//! down, so the two are kept apart.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::future::join_all;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::Serialize;

use crate::config::{AppConfig, ConfigError};
use crate::http::AppState;

/// Name of the always-registered self check.
pub const SELF_CHECK: &str = "self";

/// Name of the identity authority probe.
pub const IDENTITY_CHECK: &str = "identityapi-check";

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: HealthStatus,
    pub duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Aggregate report: unhealthy if any entry is.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub total_duration_ms: u128,
    pub entries: Vec<CheckResult>,
}

#[derive(Debug)]
enum HealthCheck {
    SelfCheck { name: &'static str },
    UrlProbe { name: &'static str, url: Uri },
}

impl HealthCheck {
    fn name(&self) -> &'static str {
        match self {
            HealthCheck::SelfCheck { name } | HealthCheck::UrlProbe { name, .. } => name,
        }
    }
}

/// All checks registered for a host, executed on demand.
#[derive(Debug)]
pub struct HealthRegistry {
    checks: Vec<HealthCheck>,
    client: Client<HttpConnector, Body>,
}

impl HealthRegistry {
    /// Register the checks the configured host needs: the self check always,
    /// plus a probe of the identity authority when a probe URL is configured.
    pub fn for_host(config: &AppConfig) -> Result<Self, ConfigError> {
        let mut checks = vec![HealthCheck::SelfCheck { name: SELF_CHECK }];

        if let Some(raw) = &config.identity_url_hc {
            let url: Uri = raw.parse().map_err(|_| ConfigError::Malformed {
                key: "IdentityUrlHC",
                reason: format!("not a valid probe URL: {raw}"),
            })?;
            checks.push(HealthCheck::UrlProbe {
                name: IDENTITY_CHECK,
                url,
            });
        }

        Ok(Self {
            checks,
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
        })
    }

    /// Run the registered checks. `self_only` restricts execution to checks
    /// whose name contains "self".
    pub async fn run(&self, self_only: bool) -> HealthReport {
        let started = Instant::now();
        let selected = self
            .checks
            .iter()
            .filter(|c| !self_only || c.name().contains("self"));

        let entries = join_all(selected.map(|check| self.execute(check))).await;
        let status = if entries.iter().all(|e| e.status == HealthStatus::Healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport {
            status,
            total_duration_ms: started.elapsed().as_millis(),
            entries,
        }
    }

    async fn execute(&self, check: &HealthCheck) -> CheckResult {
        let started = Instant::now();
        match check {
            HealthCheck::SelfCheck { name } => CheckResult {
                name,
                status: HealthStatus::Healthy,
                duration_ms: started.elapsed().as_millis(),
                description: None,
            },
            HealthCheck::UrlProbe { name, url } => {
                let (status, description) = self.probe(url).await;
                CheckResult {
                    name,
                    status,
                    duration_ms: started.elapsed().as_millis(),
                    description,
                }
            }
        }
    }

    async fn probe(&self, url: &Uri) -> (HealthStatus, Option<String>) {
        let req = Request::builder()
            .method(Method::GET)
            .uri(url.clone())
            .header("user-agent", "shopfront-health-probe")
            .body(Body::empty());
        let req = match req {
            Ok(req) => req,
            Err(e) => return (HealthStatus::Unhealthy, Some(e.to_string())),
        };

        match tokio::time::timeout(PROBE_TIMEOUT, self.client.request(req)).await {
            Ok(Ok(resp)) if resp.status().is_success() => (HealthStatus::Healthy, None),
            Ok(Ok(resp)) => (
                HealthStatus::Unhealthy,
                Some(format!("probe returned {}", resp.status())),
            ),
            Ok(Err(e)) => (HealthStatus::Unhealthy, Some(e.to_string())),
            Err(_) => (
                HealthStatus::Unhealthy,
                Some(format!("probe timed out after {PROBE_TIMEOUT:?}")),
            ),
        }
    }
}

fn status_code(status: HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// `GET /liveness`: the self check only, plain-text body.
pub async fn liveness(State(state): State<AppState>) -> Response {
    let report = state.health.run(true).await;
    let body = match report.status {
        HealthStatus::Healthy => "Healthy",
        HealthStatus::Unhealthy => "Unhealthy",
    };
    (status_code(report.status), body).into_response()
}

/// `GET /hc`: every registered check, JSON report.
pub async fn aggregate(State(state): State<AppState>) -> Response {
    let report = state.health.run(false).await;
    if report.status == HealthStatus::Unhealthy {
        tracing::warn!(duration_ms = report.total_duration_ms, "aggregate health check failed");
    }
    (status_code(report.status), Json(report)).into_response()
}

pub fn shared(config: &AppConfig) -> Result<Arc<HealthRegistry>, ConfigError> {
    Ok(Arc::new(HealthRegistry::for_host(config)?))
}
