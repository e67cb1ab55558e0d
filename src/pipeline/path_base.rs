//! Path-base rewrite stage.
//!
//! When the app is mounted under a prefix behind a reverse proxy, this stage
//! strips the prefix before anything downstream inspects the path. It is only
//! installed when a non-empty path base is configured, and runs ahead of the
//! static, fallback and routing stages.

use axum::extract::{Request, State};
use axum::http::uri::Uri;
use axum::middleware::Next;
use axum::response::Response;

#[derive(Clone)]
pub struct PathBase {
    pub prefix: String,
}

pub async fn strip_path_base(
    State(base): State<PathBase>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(rewritten) = strip_prefix(req.uri(), &base.prefix) {
        *req.uri_mut() = rewritten;
    }
    next.run(req).await
}

/// Strip `prefix` from the URI path, preserving the query. Returns `None`
/// when the path is not under the prefix (the request passes through
/// unchanged) or the prefix does not end on a segment boundary.
fn strip_prefix(uri: &Uri, prefix: &str) -> Option<Uri> {
    let rest = uri.path().strip_prefix(prefix)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    let path = if rest.is_empty() { "/" } else { rest };

    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().ok()?);
    Uri::from_parts(parts).ok()
}
