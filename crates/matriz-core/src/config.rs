use crate::gateway::DEFAULT_MIDDLEWARE_URL;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use url::Url;

pub const MIDDLEWARE_URL_ENV: &str = "MIDDLEWARE_URL";
pub const PROBE_INTERVAL_ENV: &str = "MATRIZ_PROBE_INTERVAL_SECS";
pub const SYNC_INTERVAL_ENV: &str = "MATRIZ_SYNC_INTERVAL_SECS";

const DEFAULT_PROBE_INTERVAL_SECS: u64 = 5;
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 10;
const MAX_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got '{value}'")]
    InvalidUrl { var: &'static str, value: String },
}

/// Per-call deadlines. Health checks get the shortest ones so the prober
/// stays responsive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub status: Duration,
    pub identity: Duration,
    pub sync: Duration,
    pub read: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            status: Duration::from_secs(2),
            identity: Duration::from_secs(1),
            sync: Duration::from_secs(5),
            read: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrizConfig {
    pub middleware_url: String,
    pub probe_interval: Duration,
    pub sync_interval: Duration,
    pub timeouts: Timeouts,
}

impl Default for MatrizConfig {
    fn default() -> Self {
        Self {
            middleware_url: DEFAULT_MIDDLEWARE_URL.to_string(),
            probe_interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            timeouts: Timeouts::default(),
        }
    }
}

pub fn load_config() -> Result<MatrizConfig, ConfigError> {
    config_from_lookup(|key| std::env::var(key).ok())
}

pub fn config_from_lookup<F>(lookup: F) -> Result<MatrizConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let middleware_url = resolve_middleware_url(lookup(MIDDLEWARE_URL_ENV))?;
    let probe_interval = resolve_interval(
        PROBE_INTERVAL_ENV,
        lookup(PROBE_INTERVAL_ENV),
        DEFAULT_PROBE_INTERVAL_SECS,
    );
    let sync_interval = resolve_interval(
        SYNC_INTERVAL_ENV,
        lookup(SYNC_INTERVAL_ENV),
        DEFAULT_SYNC_INTERVAL_SECS,
    );
    Ok(MatrizConfig {
        middleware_url,
        probe_interval,
        sync_interval,
        timeouts: Timeouts::default(),
    })
}

fn resolve_middleware_url(raw: Option<String>) -> Result<String, ConfigError> {
    let Some(value) = raw else {
        return Ok(DEFAULT_MIDDLEWARE_URL.to_string());
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_MIDDLEWARE_URL.to_string());
    }
    let valid = Url::parse(trimmed)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false);
    if !valid {
        return Err(ConfigError::InvalidUrl {
            var: MIDDLEWARE_URL_ENV,
            value: value.clone(),
        });
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn resolve_interval(var: &str, raw: Option<String>, default_secs: u64) -> Duration {
    let Some(value) = raw else {
        return Duration::from_secs(default_secs);
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if (1..=MAX_INTERVAL_SECS).contains(&secs) => Duration::from_secs(secs),
        _ => {
            warn!("config_invalid_interval: {var}={value:?}, using {default_secs}s");
            Duration::from_secs(default_secs)
        }
    }
}
