//! Authentication and authorization stages.
//!
//! Authentication recognizes an already-established session (the cookie is
//! the carrier scheme) and materializes a [`CurrentUser`] for downstream
//! stages. Authorization guards the host's protected route prefixes: an
//! unauthenticated caller is challenged with an OpenID Connect redirect, an
//! authenticated caller missing the required scope gets a 403. Neither
//! outcome is ever silently downgraded.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use uuid::Uuid;

use crate::auth::oidc::OidcOptions;
use crate::config::HostKind;
use crate::pipeline::bypass_auth::BypassedAuth;
use crate::session::Session;

/// A route prefix requiring an authenticated caller with a given scope.
#[derive(Debug)]
pub struct ProtectedRoute {
    pub prefix: &'static str,
    pub scope: &'static str,
}

/// Protected prefixes per host. The SPA host enforces nothing server-side;
/// its API gateway makes those decisions.
pub fn protected_routes(host: HostKind) -> &'static [ProtectedRoute] {
    const MVC: &[ProtectedRoute] = &[
        ProtectedRoute {
            prefix: "/order",
            scope: "orders",
        },
        ProtectedRoute {
            prefix: "/basket",
            scope: "basket",
        },
    ];
    const WEBHOOK: &[ProtectedRoute] = &[ProtectedRoute {
        prefix: "/hooks",
        scope: "webhooks",
    }];

    match host {
        HostKind::Mvc => MVC,
        HostKind::Webhook => WEBHOOK,
        HostKind::Spa => &[],
    }
}

/// State shared by the two stages.
#[derive(Clone)]
pub struct AuthStage {
    pub oidc: Option<Arc<OidcOptions>>,
    pub protected: &'static [ProtectedRoute],
}

/// The authenticated caller, planted in request extensions.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub subject: String,
    pub scopes: Vec<String>,
}

/// Authentication stage: recognize the session's identity, if any.
pub async fn authenticate(
    State(stage): State<AuthStage>,
    mut req: Request,
    next: Next,
) -> Response {
    if req.extensions().get::<BypassedAuth>().is_some() {
        let scopes = stage
            .oidc
            .as_ref()
            .map(|o| o.scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();
        req.extensions_mut().insert(CurrentUser {
            subject: "load-test".to_string(),
            scopes,
        });
        return next.run(req).await;
    }

    let identity = req
        .extensions()
        .get::<Session>()
        .and_then(|session| session.data().identity);
    if let Some(identity) = identity {
        req.extensions_mut().insert(CurrentUser {
            subject: identity.subject,
            scopes: identity.scopes,
        });
    }

    next.run(req).await
}

/// Authorization stage: enforce the protected prefixes.
pub async fn authorize(State(stage): State<AuthStage>, req: Request, next: Next) -> Response {
    let path = req.uri().path();
    let Some(rule) = stage.protected.iter().find(|r| path.starts_with(r.prefix)) else {
        return next.run(req).await;
    };

    match req.extensions().get::<CurrentUser>() {
        Some(user) if user.scopes.iter().any(|s| s == rule.scope) => next.run(req).await,
        Some(user) => {
            tracing::warn!(subject = %user.subject, path = %path, required = rule.scope, "caller lacks required scope");
            (StatusCode::FORBIDDEN, "Insufficient scope").into_response()
        }
        None => challenge(&stage, &req),
    }
}

/// Issue the OpenID Connect challenge redirect for an unauthenticated caller.
fn challenge(stage: &AuthStage, req: &Request) -> Response {
    let Some(oidc) = &stage.oidc else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let state = Uuid::new_v4().simple().to_string();
    let nonce = Uuid::new_v4().simple().to_string();
    if let Some(session) = req.extensions().get::<Session>() {
        let (s, n) = (state.clone(), nonce.clone());
        session.update(move |data| {
            data.pending_state = Some(s);
            data.pending_nonce = Some(n);
        });
    }

    Redirect::to(oidc.authorize_url(&state, &nonce).as_str()).into_response()
}
