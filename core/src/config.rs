//! Client defaults and where they come from.
//!
//! A `ClientConfig` can be built from `Default`, parsed from JSON, or read
//! from `REST_*` environment variables. Environment values that fail to parse
//! are skipped with a warning so a typo never prevents a client from being
//! constructed.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::RestError;
use crate::http::content_type;

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_PORT: u16 = 80;

pub const ENV_CONNECT_TIMEOUT: &str = "REST_CONNECT_TIMEOUT_MS";
pub const ENV_REQUEST_TIMEOUT: &str = "REST_REQUEST_TIMEOUT_MS";
pub const ENV_CONTENT_TYPE: &str = "REST_CONTENT_TYPE";
pub const ENV_CA_BUNDLE: &str = "REST_CA_BUNDLE";

/// Construction-time settings for a `Client`. Timeouts of 0 mean unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub content_type: String,
    /// PEM file of trusted roots; `None` uses the built-in web PKI roots.
    pub ca_bundle: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            content_type: content_type::JSON.to_string(),
            ca_bundle: None,
        }
    }
}

impl ClientConfig {
    pub fn from_json(raw: &str) -> Result<Self, RestError> {
        serde_json::from_str(raw).map_err(|e| RestError::InvalidArgument(format!("invalid client config: {e}")))
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, starting from defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(ms) = parse_ms(&lookup, ENV_CONNECT_TIMEOUT) {
            config.connect_timeout_ms = ms;
        }
        if let Some(ms) = parse_ms(&lookup, ENV_REQUEST_TIMEOUT) {
            config.request_timeout_ms = ms;
        }
        if let Some(ct) = lookup(ENV_CONTENT_TYPE).filter(|v| !v.trim().is_empty()) {
            config.content_type = ct.trim().to_string();
        }
        if let Some(path) = lookup(ENV_CA_BUNDLE).filter(|v| !v.trim().is_empty()) {
            config.ca_bundle = Some(PathBuf::from(path.trim()));
        }
        config
    }
}

fn parse_ms<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(ms),
        Err(e) => {
            log::warn!("ignoring {key}={raw:?}: {e}");
            None
        }
    }
}
