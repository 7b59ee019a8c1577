use std::time::Duration;

use crate::error::{ClientError, ClientResult};

const DEFAULT_BASE_URL: &str = "http://localhost:3333";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the posts store.
///
/// Only connection setup is bounded; a request that is connected runs until the
/// server answers or the network fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Read FILEDROP_API_URL and FILEDROP_CONNECT_TIMEOUT_SECS, falling back to defaults.
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ClientResult<Self> {
        let base_url = lookup("FILEDROP_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "FILEDROP_API_URL must be an http(s) URL, got `{}`",
                base_url
            )));
        }

        let timeout_secs = match lookup("FILEDROP_CONNECT_TIMEOUT_SECS") {
            Some(value) => value.trim().parse::<u64>().map_err(|e| {
                ClientError::Config(format!(
                    "parsing FILEDROP_CONNECT_TIMEOUT_SECS value `{}`: {}",
                    value, e
                ))
            })?,
            None => DEFAULT_CONNECT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url,
            connect_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
