//! Configuration loading: defaults, settings file, environment overlay.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::{AppConfig, HostKind};
use crate::config::validation::validate_config;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("missing required configuration key {0}")]
    MissingKey(&'static str),

    #[error("malformed {key}: {reason}")]
    Malformed { key: &'static str, reason: String },
}

/// Load the configuration snapshot: built-in defaults, overlaid by an
/// optional TOML settings file, overlaid by environment variables, then
/// validated. The host kind comes from the command line and is applied before
/// validation, since the required-key rules differ per host. Any failure here
/// is startup-fatal; nothing is deferred to the first request.
pub fn load_config(path: Option<&Path>, host: HostKind) -> Result<AppConfig, ConfigError> {
    let mut config: AppConfig = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };
    config.host = host;

    overlay_env(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Apply the environment-variable overlay. Key names mirror the deployment
/// contract of the original hosts; absent variables leave the file/default
/// value untouched, malformed ones fail loading.
pub fn overlay_env(config: &mut AppConfig) -> Result<(), ConfigError> {
    if let Some(v) = env_string("PATH_BASE") {
        config.path_base = v;
    }
    if let Some(v) = env_string("IdentityUrl") {
        config.identity_url = Some(v);
    }
    if let Some(v) = env_string("IdentityUrlHC") {
        config.identity_url_hc = Some(v);
    }
    if let Some(v) = env_string("CallBackUrl") {
        config.callback_url = Some(v);
    }
    if let Some(v) = env_bool("UseLoadTest")? {
        config.use_load_test = v;
    }
    if let Some(v) = env_bool("IsClusterEnv")? {
        config.is_cluster_env = v;
    }
    if let Some(v) = env_string("DPConnectionString") {
        config.dp_connection_string = v;
    }
    if let Some(v) = env_u64("SessionCookieLifetimeMinutes")? {
        config.session_cookie_lifetime_minutes = v;
    }
    if let Some(v) = env_string("USE_EXPORTER") {
        config.telemetry.use_exporter = v;
    }
    if let Some(v) = env_string("OTLP_ENDPOINT") {
        config.telemetry.otlp_endpoint = Some(v);
    }
    if let Some(v) = env_bool("ValidateToken")? {
        config.webhook.validate_token = v;
    }
    if let Some(v) = env_string("Token") {
        config.webhook.token = v;
    }

    Ok(())
}

fn env_string(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_bool(key: &'static str) -> Result<Option<bool>, ConfigError> {
    env_string(key).map(|v| parse_bool(key, v)).transpose()
}

fn env_u64(key: &'static str) -> Result<Option<u64>, ConfigError> {
    env_string(key).map(|v| parse_u64(key, v)).transpose()
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "expected a boolean",
        }),
    }
}

fn parse_u64(key: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value,
        reason: "expected an integer",
    })
}
