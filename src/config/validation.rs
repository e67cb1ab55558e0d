//! Semantic configuration checks.
//!
//! Serde handles the syntactic layer; this module enforces the per-host
//! requirements that must hold before any listener binds. A host missing a
//! required identity URL fails here, at startup, not on its first request.

use url::Url;

use crate::config::loader::ConfigError;
use crate::config::schema::{AppConfig, HostKind};

/// Validate the resolved snapshot for the selected host.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    match config.host {
        HostKind::Mvc => {
            require_url(&config.identity_url, "IdentityUrl")?;
            require_url(&config.callback_url, "CallBackUrl")?;
            require_url(&config.identity_url_hc, "IdentityUrlHC")?;
        }
        HostKind::Spa => {
            require_url(&config.identity_url_hc, "IdentityUrlHC")?;
        }
        HostKind::Webhook => {
            require_url(&config.identity_url, "IdentityUrl")?;
            require_url(&config.callback_url, "CallBackUrl")?;
            if let Some(url) = &config.identity_url_hc {
                check_url(url, "IdentityUrlHC")?;
            }
        }
    }

    if !config.path_base.is_empty() && !config.path_base.starts_with('/') {
        return Err(ConfigError::Malformed {
            key: "PATH_BASE",
            reason: "must start with '/'".to_string(),
        });
    }

    if config.is_cluster_env {
        check_endpoint(&config.dp_connection_string, "DPConnectionString")?;
    }

    for (name, url) in [
        ("services.catalog", &config.services.catalog),
        ("services.basket", &config.services.basket),
        ("services.ordering", &config.services.ordering),
        ("services.campaign", &config.services.campaign),
        ("services.location", &config.services.location),
        ("services.identity", &config.services.identity),
    ] {
        Url::parse(url).map_err(|e| ConfigError::Malformed {
            key: "services",
            reason: format!("{name}: {e}"),
        })?;
    }

    Ok(())
}

fn require_url(value: &Option<String>, key: &'static str) -> Result<(), ConfigError> {
    match value {
        None => Err(ConfigError::MissingKey(key)),
        Some(url) => check_url(url, key),
    }
}

fn check_url(value: &str, key: &'static str) -> Result<(), ConfigError> {
    Url::parse(value).map(|_| ()).map_err(|e| ConfigError::Malformed {
        key,
        reason: e.to_string(),
    })
}

/// A "host:port" endpoint, the shape expected of the key-ring backing store.
fn check_endpoint(value: &str, key: &'static str) -> Result<(), ConfigError> {
    let valid = match value.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Malformed {
            key,
            reason: "expected host:port".to_string(),
        })
    }
}
