//! Configuration schema definitions.
//!
//! The full settings tree for all three web hosts. Every field has a default
//! so a minimal settings file (or none at all) is enough to boot a host in
//! development. The struct is resolved once at startup and shared read-only.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which front-end host this process runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    /// Server-rendered web client.
    Mvc,
    /// Single-page-application host (static assets + client-side routing).
    Spa,
    /// Webhook client host.
    Webhook,
}

impl HostKind {
    /// Static service name used for telemetry resources and metrics labels.
    pub fn service_name(self) -> &'static str {
        match self {
            HostKind::Mvc => "webmvc",
            HostKind::Spa => "webspa",
            HostKind::Webhook => "webhookclient",
        }
    }

    /// Discriminator for the session cookie, so hosts sharing a domain do not
    /// clobber each other's sessions.
    pub fn session_cookie_name(self) -> &'static str {
        match self {
            HostKind::Mvc => ".Shopfront.Mvc.Session",
            HostKind::Spa => ".Shopfront.Spa.Session",
            HostKind::Webhook => ".Shopfront.Webhooks.Session",
        }
    }
}

/// Hosting environment mode. Controls how unhandled failures are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Root configuration for a web host.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Host kind. Normally supplied on the command line.
    pub host: HostKind,

    /// Development or production mode.
    pub environment: Environment,

    /// Bind address (e.g. "0.0.0.0:5100").
    pub bind_address: String,

    /// URL path prefix the app is mounted under, behind a reverse proxy.
    /// Empty means no rewrite stage is installed. Env: `PATH_BASE`.
    pub path_base: String,

    /// Root directory for static assets.
    pub static_root: String,

    /// Identity authority base URL. Env: `IdentityUrl`.
    pub identity_url: Option<String>,

    /// URL probed by the aggregate health check. Env: `IdentityUrlHC`.
    pub identity_url_hc: Option<String>,

    /// Post-sign-out redirect target. Env: `CallBackUrl`.
    pub callback_url: Option<String>,

    /// Load-test escape hatch: bypasses authentication and switches the
    /// OpenID Connect client to the headless flow. Env: `UseLoadTest`.
    pub use_load_test: bool,

    /// Set when running inside a cluster; requires a key-ring backing store
    /// connection string. Env: `IsClusterEnv`.
    pub is_cluster_env: bool,

    /// Backing store for shared key material, "host:port". Only validated
    /// (and required) when `is_cluster_env` is set. Env: `DPConnectionString`.
    pub dp_connection_string: String,

    /// Session cookie lifetime in minutes. The webhook host ignores this and
    /// uses a fixed 120 minutes. Env: `SessionCookieLifetimeMinutes`.
    pub session_cookie_lifetime_minutes: u64,

    /// OpenID Connect client secret shared with the identity authority.
    pub client_secret: String,

    /// Base URLs of the backend capabilities.
    pub services: ServiceUrls,

    /// Dev-space request routing.
    pub devspaces: DevspacesConfig,

    /// Tracing exporter selection.
    pub telemetry: TelemetryConfig,

    /// Webhook handshake settings. Env: `ValidateToken`, `Token`.
    pub webhook: WebhookConfig,

    /// Metrics exposition.
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: HostKind::Mvc,
            environment: Environment::Production,
            bind_address: "0.0.0.0:5100".to_string(),
            path_base: String::new(),
            static_root: "wwwroot".to_string(),
            identity_url: None,
            identity_url_hc: None,
            callback_url: None,
            use_load_test: false,
            is_cluster_env: false,
            dp_connection_string: String::new(),
            session_cookie_lifetime_minutes: 60,
            client_secret: "secret".to_string(),
            services: ServiceUrls::default(),
            devspaces: DevspacesConfig::default(),
            telemetry: TelemetryConfig::default(),
            webhook: WebhookConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Effective session lifetime for this host.
    pub fn session_lifetime(&self) -> Duration {
        let minutes = match self.host {
            HostKind::Webhook => 120,
            _ => self.session_cookie_lifetime_minutes,
        };
        Duration::from_secs(minutes * 60)
    }
}

/// Base URLs of the remote capabilities, one per logical client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceUrls {
    pub catalog: String,
    pub basket: String,
    pub ordering: String,
    pub campaign: String,
    pub location: String,
    pub identity: String,
}

impl Default for ServiceUrls {
    fn default() -> Self {
        Self {
            catalog: "http://localhost:5101".to_string(),
            basket: "http://localhost:5103".to_string(),
            ordering: "http://localhost:5102".to_string(),
            campaign: "http://localhost:5110".to_string(),
            location: "http://localhost:5109".to_string(),
            identity: "http://localhost:5105".to_string(),
        }
    }
}

/// Dev-space routing: when enabled, outbound calls honor a routing header
/// from the inbound request and are redirected to the named dev space.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DevspacesConfig {
    pub enabled: bool,

    /// Header carrying the dev-space name on inbound requests.
    pub routing_header: String,
}

impl Default for DevspacesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            routing_header: "azds-route-as".to_string(),
        }
    }
}

/// Tracing exporter selection. `use_exporter` accepts "jaeger", "zipkin" or
/// "otlp" (case-insensitive); empty disables span export. The environment
/// variable `USE_EXPORTER` overrides the file value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub use_exporter: String,

    /// OTLP collector endpoint. Env: `OTLP_ENDPOINT`.
    pub otlp_endpoint: Option<String>,

    /// Jaeger collector endpoint (OTLP ingestion port).
    pub jaeger_endpoint: Option<String>,

    /// Zipkin collector endpoint (OTLP/HTTP ingestion).
    pub zipkin_endpoint: Option<String>,
}

/// Webhook handshake settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// When set, the `/check` handshake requires the shared token.
    pub validate_token: bool,

    /// Shared secret echoed back to the webhook dispatcher.
    pub token: String,
}

/// Metrics exposition settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Scrape endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
