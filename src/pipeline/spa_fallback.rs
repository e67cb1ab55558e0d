//! Client-side-routing fallback for the SPA host.
//!
//! Wraps the static-asset and routing stages. When the downstream pipeline
//! answers 404 for an extensionless, non-API path, the request is almost
//! certainly a client-side route: the stage re-dispatches the same request as
//! `/index.html` and forces the final status to 200. The rewrite happens at
//! most once per request; the second pass never re-evaluates the condition,
//! so a missing index file cannot loop. No redirect is issued; the browser
//! URL is left untouched on purpose.

use std::convert::Infallible;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::uri::{PathAndQuery, Uri};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use tower::{Layer, Service};

/// Reserved prefix that is never rewritten; API 404s are real 404s.
const API_PREFIX: &str = "/api";

/// True when a 404 for this path should fall back to the app root.
pub fn should_fall_back(path: &str) -> bool {
    !path.starts_with(API_PREFIX) && Path::new(path).extension().is_none()
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SpaFallbackLayer;

impl<S> Layer<S> for SpaFallbackLayer {
    type Service = SpaFallback<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SpaFallback { inner }
    }
}

/// Tower service performing the at-most-once fallback dispatch.
#[derive(Clone)]
pub struct SpaFallback<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for SpaFallback<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Take the ready service and leave a clone behind, the usual pattern
        // for services whose readiness was just polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let retry_parts = parts.clone();
            let path = parts.uri.path().to_string();

            let response = inner.call(Request::from_parts(parts, body)).await?;

            if response.status() != StatusCode::NOT_FOUND || !should_fall_back(&path) {
                return Ok(response);
            }

            tracing::debug!(path = %path, "rewriting not-found page request to app root");

            let mut parts = retry_parts;
            parts.uri = rewrite_to_index(&parts.uri);
            // The original body was consumed by the first pass; the rewritten
            // request is a plain asset fetch and needs none.
            let second = Request::from_parts(parts, Body::empty());

            let mut response = inner.call(second).await?;
            *response.status_mut() = StatusCode::OK;
            Ok(response)
        })
    }
}

fn rewrite_to_index(uri: &Uri) -> Uri {
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::from_static("/index.html"));
    Uri::from_parts(parts).unwrap_or_else(|_| Uri::from_static("/index.html"))
}
