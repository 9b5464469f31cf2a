//! Client configuration.
//!
//! Override via environment variables or explicit construction.

use std::collections::BTreeMap;

use accord_core::env_flag;
use url::Url;

/// Configuration for calling a service that implements an accord contract.
///
/// Custom `Debug` implementation redacts header values, which commonly carry
/// credentials.
#[derive(Clone)]
pub struct ClientConfig {
    /// Service root. Route paths are appended to it.
    pub base_url: Url,
    /// Headers sent with every call unless the call sets them itself.
    pub base_headers: BTreeMap<String, String>,
    /// Encode query values as JSON text.
    pub json_query: bool,
    /// Validate response bodies against the declared response schema.
    pub validate_response: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers: Vec<&str> = self.base_headers.keys().map(String::as_str).collect();
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("base_headers", &headers)
            .field("json_query", &self.json_query)
            .field("validate_response", &self.validate_response)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            base_headers: BTreeMap::new(),
            json_query: false,
            validate_response: false,
            timeout_secs: 30,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ACCORD_BASE_URL` (default: `http://127.0.0.1:8080`)
    /// - `ACCORD_TIMEOUT_SECS` (default: 30)
    /// - `ACCORD_JSON_QUERY` (`true`/`1` to enable)
    /// - `ACCORD_VALIDATE_RESPONSE` (`true`/`1` to enable)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("ACCORD_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());
        let base_url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidUrl("ACCORD_BASE_URL".to_string(), e.to_string()))?;

        Ok(Self {
            base_url,
            base_headers: BTreeMap::new(),
            json_query: env_flag("ACCORD_JSON_QUERY"),
            validate_response: env_flag("ACCORD_VALIDATE_RESPONSE"),
            timeout_secs: std::env::var("ACCORD_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }

    pub fn base_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.base_headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn json_query(mut self, enabled: bool) -> Self {
        self.json_query = enabled;
        self
    }

    pub fn validate_response(mut self, enabled: bool) -> Self {
        self.validate_response = enabled;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
