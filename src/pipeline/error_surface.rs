//! Error-surface stage.
//!
//! The single point where unhandled failures become a user-visible response.
//! Panics are converted to 500s by the catch-panic layer sitting just inside
//! this stage; this stage then either renders a diagnostic page (development)
//! or sends the client to the generic error page (any other mode). Lower
//! layers never swallow errors; they surface here.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

/// Upper bound on how much of a failed response body the diagnostic page
/// reproduces.
const DIAGNOSTIC_BODY_LIMIT: usize = 64 * 1024;

#[derive(Clone, Copy)]
pub struct ErrorSurface {
    pub development: bool,
}

pub async fn surface_errors(
    State(stage): State<ErrorSurface>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    if response.status() != StatusCode::INTERNAL_SERVER_ERROR {
        return response;
    }

    tracing::error!(method = %method, path = %path, "unhandled failure in request pipeline");

    if stage.development {
        let (_, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, DIAGNOSTIC_BODY_LIMIT)
            .await
            .unwrap_or_default();
        let detail = String::from_utf8_lossy(&bytes);
        let page = format!("Unhandled error while processing {method} {path}\n\n{detail}");

        let mut diagnostic = Response::new(Body::from(page));
        *diagnostic.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        diagnostic.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        diagnostic
    } else {
        Redirect::to("/Error").into_response()
    }
}
