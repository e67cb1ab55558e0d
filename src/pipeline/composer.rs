//! Pipeline composition.
//!
//! The ordered stage list is computed as data by [`plan`] and then realized
//! as a layered router by [`compose`]. Keeping the plan separate makes the
//! ordering rules testable without binding a socket: stage order is a
//! correctness property here, not a style choice.

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::{authenticate, authorize, protected_routes, AuthStage};
use crate::config::{AppConfig, HostKind};
use crate::health;
use crate::http::{host_routes, AppState};
use crate::observability::{record_request_metrics, MetricsStage};
use crate::pipeline::bypass_auth::bypass_authentication;
use crate::pipeline::cookie_policy::enforce_same_site;
use crate::pipeline::error_surface::{surface_errors, ErrorSurface};
use crate::pipeline::path_base::{strip_path_base, PathBase};
use crate::pipeline::spa_fallback::SpaFallbackLayer;
use crate::session::{attach_session, SessionStage};
use crate::webhook;

/// One stage of the request pipeline, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    ErrorSurface,
    PathBase,
    SpaFallback,
    StaticAssets,
    Session,
    BypassAuth,
    CookiePolicy,
    Routing,
    Authentication,
    Authorization,
    Endpoints,
}

/// The ordered stage list for a configuration. Conditional stages appear only
/// when their condition holds; order is otherwise fixed.
pub fn plan(config: &AppConfig) -> Vec<Stage> {
    let mut stages = vec![Stage::ErrorSurface];
    if !config.path_base.is_empty() {
        stages.push(Stage::PathBase);
    }
    if config.host == HostKind::Spa {
        stages.push(Stage::SpaFallback);
    }
    stages.push(Stage::StaticAssets);
    stages.push(Stage::Session);
    if config.use_load_test {
        stages.push(Stage::BypassAuth);
    }
    stages.extend([
        Stage::CookiePolicy,
        Stage::Routing,
        Stage::Authentication,
        Stage::Authorization,
        Stage::Endpoints,
    ]);
    stages
}

/// Build the full router for the host. Layer ordering mirrors [`plan`]: the
/// last layer added to a router is the first to see a request.
pub fn compose(state: AppState) -> Router {
    let config = state.config.clone();
    tracing::debug!(stages = ?plan(&config), "composing pipeline");

    let mut routed = host_routes(config.host)
        .route("/liveness", get(health::liveness))
        .route("/hc", get(health::aggregate));
    if config.host == HostKind::Webhook {
        routed = routed.route(
            "/check",
            axum::routing::any(webhook::check),
        );
    }

    let auth_stage = AuthStage {
        oidc: state.oidc.clone(),
        protected: protected_routes(config.host),
    };
    let session_stage = SessionStage {
        store: state.sessions.clone(),
        cookie_name: config.host.session_cookie_name(),
    };

    let mut routed = routed
        .with_state(state)
        .layer(from_fn_with_state(auth_stage.clone(), authorize))
        .layer(from_fn_with_state(auth_stage, authenticate));
    if config.use_load_test {
        routed = routed.layer(from_fn(bypass_authentication));
    }
    // The cookie policy acts only on responses, so it sits outside the
    // session layer: the session cookie appended on the way out must pass
    // through it like any other cookie.
    let routed = routed
        .layer(from_fn_with_state(session_stage, attach_session))
        .layer(from_fn(enforce_same_site));

    // Static assets first, the routed pipeline as their fallback.
    let assets = ServeDir::new(&config.static_root)
        .append_index_html_on_directories(true)
        .call_fallback_on_method_not_allowed(true)
        .fallback(routed);

    let mut app = Router::new().fallback_service(assets);

    if config.host == HostKind::Spa {
        app = app.layer(SpaFallbackLayer);
    }
    if !config.path_base.is_empty() {
        app = app.layer(from_fn_with_state(
            PathBase {
                prefix: config.path_base.clone(),
            },
            strip_path_base,
        ));
    }

    app.layer(CatchPanicLayer::new())
        .layer(from_fn_with_state(
            ErrorSurface {
                development: config.environment.is_development(),
            },
            surface_errors,
        ))
        .layer(from_fn_with_state(
            MetricsStage {
                service: config.host.service_name(),
            },
            record_request_metrics,
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
