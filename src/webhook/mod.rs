//! Webhook registration handshake.
//!
//! A webhook dispatcher verifies it is talking to a willing receiver by
//! sending an OPTIONS request to `/check` carrying a shared token header.
//! The outcome is decided by [`evaluate`], a pure function over the method,
//! the presented token and the host's settings, so the whole decision matrix
//! is unit-testable without a server.

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::config::schema::WebhookConfig;
use crate::http::AppState;

/// Header carrying the shared handshake token.
pub const WEBHOOK_CHECK_HEADER: &str = "x-eshop-whtoken";

/// Settings the handshake decision reads.
#[derive(Clone, Debug)]
pub struct CheckSettings {
    pub validate_token: bool,
    pub token: String,
}

impl From<&WebhookConfig> for CheckSettings {
    fn from(config: &WebhookConfig) -> Self {
        Self {
            validate_token: config.validate_token,
            token: config.token.clone(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Handshake accepted; `echo` is the token to mirror back, when one is
    /// configured and non-blank.
    Accepted { echo: Option<String> },
    InvalidToken,
    WrongMethod,
}

/// Decide the handshake outcome. An absent header counts as an empty token,
/// so a host configured with an empty token accepts a bare OPTIONS request
/// even with validation on.
pub fn evaluate(method: &Method, presented: Option<&str>, settings: &CheckSettings) -> CheckOutcome {
    if method != Method::OPTIONS {
        return CheckOutcome::WrongMethod;
    }

    if settings.validate_token && presented.unwrap_or_default() != settings.token {
        return CheckOutcome::InvalidToken;
    }

    let echo = match settings.token.trim() {
        "" => None,
        token => Some(token.to_string()),
    };
    CheckOutcome::Accepted { echo }
}

/// `/check` endpoint on the webhook host.
pub async fn check(State(state): State<AppState>, method: Method, headers: HeaderMap) -> Response {
    let settings = CheckSettings::from(&state.config.webhook);
    let presented = headers
        .get(WEBHOOK_CHECK_HEADER)
        .and_then(|v| v.to_str().ok());

    match evaluate(&method, presented, &settings) {
        CheckOutcome::Accepted { echo } => {
            let mut response = StatusCode::OK.into_response();
            if let Some(token) = echo {
                if let Ok(value) = token.parse() {
                    response.headers_mut().insert(WEBHOOK_CHECK_HEADER, value);
                }
            }
            response
        }
        CheckOutcome::InvalidToken => {
            tracing::warn!("webhook handshake rejected: token mismatch");
            (StatusCode::BAD_REQUEST, "Invalid token").into_response()
        }
        CheckOutcome::WrongMethod => StatusCode::BAD_REQUEST.into_response(),
    }
}
