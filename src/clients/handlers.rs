//! Delegating handlers for outbound requests.
//!
//! Each handler is a small request mutation applied in a fixed order before
//! an outbound call leaves the process. Handlers read everything they need
//! from the per-request [`RequestContext`]; nothing is cached across
//! requests, so a pooled connection can never leak one caller's token into
//! another caller's request.

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue, Request};

use crate::session::Session;

/// Correlation header attached to outbound service calls.
pub const REQUEST_ID_HEADER: &str = "x-requestid";

/// Correlation header assigned at ingress by the request-id layer.
pub const INBOUND_REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerKind {
    /// Copies the session's bearer token onto the Authorization header.
    Authorization,
    /// Propagates the inbound correlation id for end-to-end tracing.
    RequestId,
}

/// Everything the handler chain may read, captured from the inbound request.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub bearer_token: Option<String>,
    pub request_id: Option<String>,
    /// Dev-space routing target from the inbound routing header.
    pub route_as: Option<String>,
}

impl RequestContext {
    pub fn from_parts(
        session: Option<&Session>,
        headers: &HeaderMap,
        routing_header: &str,
    ) -> Self {
        Self {
            bearer_token: session.and_then(|s| s.data().access_token),
            request_id: header_string(headers, INBOUND_REQUEST_ID_HEADER),
            route_as: header_string(headers, routing_header),
        }
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Apply one handler to an outbound request.
pub fn apply<B>(kind: HandlerKind, ctx: &RequestContext, req: &mut Request<B>) {
    match kind {
        HandlerKind::Authorization => {
            if let Some(token) = &ctx.bearer_token {
                if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                    req.headers_mut().insert(AUTHORIZATION, value);
                }
            }
        }
        HandlerKind::RequestId => {
            if let Some(id) = &ctx.request_id {
                if let Ok(value) = HeaderValue::from_str(id) {
                    req.headers_mut().insert(REQUEST_ID_HEADER, value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn outbound() -> Request<Body> {
        Request::builder()
            .uri("http://ordering:5102/api/v1/orders")
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn authorization_handler_attaches_bearer_token() {
        let ctx = RequestContext {
            bearer_token: Some("abc".to_string()),
            ..RequestContext::default()
        };
        let mut req = outbound();
        apply(HandlerKind::Authorization, &ctx, &mut req);
        assert_eq!(
            req.headers().get(AUTHORIZATION).unwrap().to_str().unwrap(),
            "Bearer abc"
        );
    }

    #[test]
    fn authorization_handler_is_a_noop_without_a_token() {
        let ctx = RequestContext::default();
        let mut req = outbound();
        apply(HandlerKind::Authorization, &ctx, &mut req);
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn request_id_handler_propagates_the_correlation_id() {
        let ctx = RequestContext {
            request_id: Some("req-42".to_string()),
            ..RequestContext::default()
        };
        let mut req = outbound();
        apply(HandlerKind::RequestId, &ctx, &mut req);
        assert_eq!(
            req.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap(),
            "req-42"
        );
    }

    #[test]
    fn context_captures_inbound_correlation_and_routing_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            INBOUND_REQUEST_ID_HEADER,
            HeaderValue::from_static("req-7"),
        );
        headers.insert("azds-route-as", HeaderValue::from_static("alice"));

        let ctx = RequestContext::from_parts(None, &headers, "azds-route-as");
        assert_eq!(ctx.request_id.as_deref(), Some("req-7"));
        assert_eq!(ctx.route_as.as_deref(), Some("alice"));
        assert!(ctx.bearer_token.is_none());
    }
}
