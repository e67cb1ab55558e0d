//! Session subsystem: cookie-keyed server-side state.
//!
//! The middleware resolves (or mints) a session from the host's session
//! cookie and plants a [`Session`] handle in request extensions. The cookie
//! itself carries only the session id; tokens and identity stay server-side.

pub mod store;

pub use store::{Identity, Session, SessionData, SessionStore};

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

/// State for the session stage.
#[derive(Clone)]
pub struct SessionStage {
    pub store: Arc<SessionStore>,
    pub cookie_name: &'static str,
}

/// Session middleware. Runs after static assets and before any stage that
/// makes identity decisions.
pub async fn attach_session(
    State(stage): State<SessionStage>,
    mut req: Request,
    next: Next,
) -> Response {
    let presented = cookie_value(req.headers(), stage.cookie_name)
        .and_then(|v| Uuid::parse_str(&v).ok());
    let (id, created) = stage.store.open(presented);

    req.extensions_mut()
        .insert(Session::new(id, stage.store.clone()));

    let mut response = next.run(req).await;

    if created {
        let cookie = format!("{}={}; Path=/; HttpOnly", stage.cookie_name, id);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}

/// Extract a single cookie value from the request headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some((key, value)) = pair.trim().split_once('=') {
                if key == name {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_value_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("a=1; .Shopfront.Mvc.Session=abc-123; b=2"),
        );
        assert_eq!(
            cookie_value(&headers, ".Shopfront.Mvc.Session").as_deref(),
            Some("abc-123")
        );
        assert_eq!(cookie_value(&headers, "missing"), None);
    }
}
