//! OpenID Connect challenge configuration.
//!
//! This module only selects and configures the external flow: which client
//! identifier, response type and scope set each host presents to the identity
//! authority. Token validation itself is the authority's job; the hosts treat
//! returned tokens as opaque values stored against the session.

use url::Url;

use crate::config::{AppConfig, ConfigError, HostKind};

/// Scope set requested by the server-rendered web client.
pub const MVC_SCOPES: &[&str] = &[
    "openid",
    "profile",
    "orders",
    "basket",
    "marketing",
    "locations",
    "webshoppingagg",
    "orders.signalrhub",
];

/// Scope set requested by the webhook client.
pub const WEBHOOK_SCOPES: &[&str] = &["openid", "webhooks"];

/// Scopes a host requests at sign-in. The SPA host performs no interactive
/// challenge of its own; its front end authenticates directly.
pub fn scopes_for(host: HostKind) -> &'static [&'static str] {
    match host {
        HostKind::Mvc => MVC_SCOPES,
        HostKind::Webhook => WEBHOOK_SCOPES,
        HostKind::Spa => &[],
    }
}

/// Resolved challenge-scheme options for one host.
#[derive(Clone, Debug)]
pub struct OidcOptions {
    pub authority: Url,
    pub client_id: &'static str,
    pub client_secret: String,
    pub response_type: &'static str,
    /// Public base URL of this host; also the post-sign-out redirect target.
    pub callback_url: Url,
    pub scopes: &'static [&'static str],
}

impl OidcOptions {
    /// Build the options for the configured host, or `None` for hosts that
    /// never challenge interactively.
    pub fn for_host(config: &AppConfig) -> Result<Option<Self>, ConfigError> {
        let (client_id, response_type) = match (config.host, config.use_load_test) {
            (HostKind::Spa, _) => return Ok(None),
            (HostKind::Mvc, false) => ("mvc", "code id_token"),
            // Headless load-test flow: distinct client, token in the response.
            (HostKind::Mvc, true) => ("mvctest", "code id_token token"),
            (HostKind::Webhook, _) => ("webhooksclient", "code id_token"),
        };

        let authority = parse_url(&config.identity_url, "IdentityUrl")?;
        let callback_url = parse_url(&config.callback_url, "CallBackUrl")?;

        Ok(Some(Self {
            authority,
            client_id,
            client_secret: config.client_secret.clone(),
            response_type,
            callback_url,
            scopes: scopes_for(config.host),
        }))
    }

    /// The authorize redirect sent to an unauthenticated caller.
    pub fn authorize_url(&self, state: &str, nonce: &str) -> Url {
        let mut url = join_path(&self.authority, "connect/authorize");
        url.query_pairs_mut()
            .append_pair("client_id", self.client_id)
            .append_pair("response_type", self.response_type)
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("redirect_uri", self.redirect_uri().as_str())
            .append_pair("state", state)
            .append_pair("nonce", nonce);
        url
    }

    /// Where the authority sends the caller back after sign-in.
    pub fn redirect_uri(&self) -> Url {
        join_path(&self.callback_url, "signin-oidc")
    }

    /// End-session redirect; the authority returns the caller to the host.
    pub fn end_session_url(&self) -> Url {
        let mut url = join_path(&self.authority, "connect/endsession");
        url.query_pairs_mut()
            .append_pair("post_logout_redirect_uri", self.callback_url.as_str());
        url
    }
}

fn parse_url(value: &Option<String>, key: &'static str) -> Result<Url, ConfigError> {
    let raw = value.as_deref().ok_or(ConfigError::MissingKey(key))?;
    Url::parse(raw).map_err(|e| ConfigError::Malformed {
        key,
        reason: e.to_string(),
    })
}

fn join_path(base: &Url, segment: &str) -> Url {
    let mut url = base.clone();
    let path = format!("{}/{}", url.path().trim_end_matches('/'), segment);
    url.set_path(&path);
    url.set_query(None);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mvc_config() -> AppConfig {
        AppConfig {
            host: HostKind::Mvc,
            identity_url: Some("http://identity:5105".to_string()),
            callback_url: Some("http://webmvc:5100".to_string()),
            ..AppConfig::default()
        }
    }

    #[test]
    fn mvc_requests_its_full_scope_set() {
        let options = OidcOptions::for_host(&mvc_config()).unwrap().unwrap();
        assert_eq!(options.client_id, "mvc");
        assert_eq!(options.response_type, "code id_token");

        let url = options.authorize_url("st", "no");
        let query = url.query().unwrap();
        assert!(query.contains("scope=openid+profile+orders+basket+marketing+locations+webshoppingagg+orders.signalrhub"));
        assert!(query.contains("client_id=mvc"));
        assert!(url.path().ends_with("/connect/authorize"));
    }

    #[test]
    fn load_test_switches_client_and_response_type() {
        let mut config = mvc_config();
        config.use_load_test = true;
        let options = OidcOptions::for_host(&config).unwrap().unwrap();
        assert_eq!(options.client_id, "mvctest");
        assert_eq!(options.response_type, "code id_token token");
    }

    #[test]
    fn webhook_host_requests_only_webhook_scopes() {
        let mut config = mvc_config();
        config.host = HostKind::Webhook;
        let options = OidcOptions::for_host(&config).unwrap().unwrap();
        assert_eq!(options.client_id, "webhooksclient");
        assert_eq!(options.scopes, WEBHOOK_SCOPES);
    }

    #[test]
    fn spa_host_has_no_interactive_challenge() {
        let mut config = mvc_config();
        config.host = HostKind::Spa;
        assert!(OidcOptions::for_host(&config).unwrap().is_none());
    }

    #[test]
    fn missing_identity_url_is_startup_fatal() {
        let mut config = mvc_config();
        config.identity_url = None;
        let err = OidcOptions::for_host(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("IdentityUrl")));
    }
}
