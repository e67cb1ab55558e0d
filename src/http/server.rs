//! HTTP server: host construction, route tables and the serve loop.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Extension, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::auth::OidcOptions;
use crate::clients::{Capability, ClientError, ClientRegistry, RequestContext};
use crate::config::{validate_config, AppConfig, ConfigError, HostKind};
use crate::health::{self, HealthRegistry};
use crate::pipeline::compose;
use crate::session::{Identity, Session, SessionStore};

/// Interval between expired-session sweeps.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Everything request handlers share, resolved once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionStore>,
    pub clients: Arc<ClientRegistry>,
    pub health: Arc<HealthRegistry>,
    pub oidc: Option<Arc<OidcOptions>>,
}

/// One configured web host, ready to serve.
pub struct WebHost {
    router: Router,
    config: Arc<AppConfig>,
    sessions: Arc<SessionStore>,
}

impl WebHost {
    /// Validate the configuration and assemble the host's pipeline.
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        validate_config(&config)?;

        let sessions = Arc::new(SessionStore::new(config.session_lifetime()));
        let clients = Arc::new(ClientRegistry::from_config(&config)?);
        let health = health::shared(&config)?;
        let oidc = OidcOptions::for_host(&config)?.map(Arc::new);
        let config = Arc::new(config);

        let state = AppState {
            config: config.clone(),
            sessions: sessions.clone(),
            clients,
            health,
            oidc,
        };
        let router = compose(state);

        tracing::info!(
            service = config.host.service_name(),
            environment = ?config.environment,
            "host assembled"
        );

        Ok(Self {
            router,
            config,
            sessions,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Serve until the shutdown signal fires. Also owns the background
    /// session sweeper, which stops with the server.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        let mut sweeper_shutdown = shutdown.resubscribe();
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(SESSION_SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let removed = sessions.purge_expired();
                        if removed > 0 {
                            tracing::debug!(removed, "swept expired sessions");
                        }
                    }
                    _ = sweeper_shutdown.recv() => break,
                }
            }
        });

        tracing::info!(
            addr = %listener.local_addr()?,
            service = self.config.host.service_name(),
            "listening"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("shutdown signal received, draining connections");
            })
            .await
    }
}

/// The host-specific route table. Static assets, health endpoints and the
/// webhook handshake are wired by the composer, not here.
pub fn host_routes(host: HostKind) -> Router<AppState> {
    match host {
        HostKind::Mvc => Router::new()
            .route("/", get(catalog_home))
            .route("/Error", get(error_page))
            .route("/signin-oidc", get(signin_callback))
            .route("/signout", get(signout))
            .route("/order", get(orders_page))
            .route("/basket", get(basket_page)),
        // The SPA host serves static assets only; everything dynamic lives
        // behind its API gateway.
        HostKind::Spa => Router::new(),
        HostKind::Webhook => Router::new()
            .route("/", get(webhook_home))
            .route("/Error", get(error_page))
            .route("/signin-oidc", get(signin_callback))
            .route("/signout", get(signout))
            .route("/hooks", get(hooks_page)),
    }
}

fn request_context(
    state: &AppState,
    session: Option<&Session>,
    headers: &HeaderMap,
) -> RequestContext {
    RequestContext::from_parts(session, headers, &state.config.devspaces.routing_header)
}

/// Convert an upstream response into ours, unchanged, or a 502 when the
/// transport itself failed.
fn relay(capability: Capability, result: Result<Response<hyper::body::Incoming>, ClientError>) -> Response {
    match result {
        Ok(upstream) => {
            let (parts, body) = upstream.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(client = capability.name(), error = %e, "outbound call failed");
            (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response()
        }
    }
}

async fn catalog_home(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
) -> Response {
    let ctx = request_context(&state, Some(&session), &headers);
    let result = state
        .clients
        .client(Capability::Catalog)
        .get(&ctx, "/api/v1/catalog/items?pageSize=12&pageIndex=0")
        .await;
    relay(Capability::Catalog, result)
}

async fn orders_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
) -> Response {
    let ctx = request_context(&state, Some(&session), &headers);
    let result = state
        .clients
        .client(Capability::Ordering)
        .get(&ctx, "/api/v1/orders")
        .await;
    relay(Capability::Ordering, result)
}

async fn basket_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
) -> Response {
    let ctx = request_context(&state, Some(&session), &headers);
    let result = state
        .clients
        .client(Capability::Basket)
        .get(&ctx, "/api/v1/basket")
        .await;
    relay(Capability::Basket, result)
}

async fn webhook_home() -> Html<&'static str> {
    Html("<html><body><h1>Webhook client</h1><p><a href=\"/hooks\">Registered hooks</a></p></body></html>")
}

async fn hooks_page(Extension(session): Extension<Session>) -> Response {
    let subject = session
        .data()
        .identity
        .map(|i| i.subject)
        .unwrap_or_else(|| "anonymous".to_string());
    Html(format!(
        "<html><body><h1>Registered hooks</h1><p>Signed in as {subject}</p></body></html>"
    ))
    .into_response()
}

async fn error_page() -> Html<&'static str> {
    Html("<html><body><h1>Something went wrong</h1><p>Try again later.</p></body></html>")
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    state: Option<String>,
    #[allow(dead_code)]
    code: Option<String>,
    id_token: Option<String>,
    access_token: Option<String>,
}

/// Sign-in callback: the authority sends the caller back here. The state
/// value must match the one stored when the challenge was issued.
async fn signin_callback(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let pending = session.data().pending_state;
    if pending.is_none() || pending != query.state {
        tracing::warn!("sign-in callback with unknown or missing state");
        return (StatusCode::BAD_REQUEST, "invalid sign-in state").into_response();
    }

    let scopes: Vec<String> = state
        .oidc
        .as_ref()
        .map(|o| o.scopes.iter().map(|s| s.to_string()).collect())
        .unwrap_or_default();
    let subject = format!("user-{}", session.id.simple());

    session.update(move |data| {
        data.access_token = query.access_token;
        data.id_token = query.id_token;
        data.identity = Some(Identity { subject, scopes });
        data.pending_state = None;
        data.pending_nonce = None;
    });

    Redirect::to("/").into_response()
}

/// Sign out: drop the session's identity and hand the caller to the
/// authority's end-session endpoint.
async fn signout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Response {
    session.update(|data| *data = Default::default());

    match &state.oidc {
        Some(oidc) => Redirect::to(oidc.end_session_url().as_str()).into_response(),
        None => Redirect::to("/").into_response(),
    }
}
