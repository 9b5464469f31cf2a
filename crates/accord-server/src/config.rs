//! Dispatch engine configuration.
//!
//! All flags default to off. Override via environment variables or explicit
//! construction.

use accord_core::env_flag;
use serde::Deserialize;

/// Behaviour switches for a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Parse every top-level query value as JSON before validation.
    pub json_query: bool,
    /// Validate handler responses against the declared response schema.
    pub response_validation: bool,
    /// Surface request validation failures as errors (handed to the error
    /// handler) instead of answering 400 directly.
    pub throw_request_validation: bool,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables (each enabled by `true` or `1`, default off):
    /// - `ACCORD_JSON_QUERY`
    /// - `ACCORD_RESPONSE_VALIDATION`
    /// - `ACCORD_THROW_REQUEST_VALIDATION`
    pub fn from_env() -> Self {
        Self {
            json_query: env_flag("ACCORD_JSON_QUERY"),
            response_validation: env_flag("ACCORD_RESPONSE_VALIDATION"),
            throw_request_validation: env_flag("ACCORD_THROW_REQUEST_VALIDATION"),
        }
    }

    pub fn json_query(mut self, enabled: bool) -> Self {
        self.json_query = enabled;
        self
    }

    pub fn response_validation(mut self, enabled: bool) -> Self {
        self.response_validation = enabled;
        self
    }

    pub fn throw_request_validation(mut self, enabled: bool) -> Self {
        self.throw_request_validation = enabled;
        self
    }
}
