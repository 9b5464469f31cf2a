//! Client error types.

use accord_core::PathError;
use accord_schema::ValidationError;
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

/// Per-source input validation failures for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputErrors {
    pub path_parameter_errors: Option<ValidationError>,
    pub header_errors: Option<ValidationError>,
    pub query_parameter_errors: Option<ValidationError>,
    pub body_errors: Option<ValidationError>,
}

impl InputErrors {
    pub fn is_empty(&self) -> bool {
        self.path_parameter_errors.is_none()
            && self.header_errors.is_none()
            && self.query_parameter_errors.is_none()
            && self.body_errors.is_none()
    }

    fn count(&self) -> usize {
        [
            &self.path_parameter_errors,
            &self.header_errors,
            &self.query_parameter_errors,
            &self.body_errors,
        ]
        .iter()
        .filter_map(|e| e.as_ref())
        .map(|e| e.issues.len())
        .sum()
    }
}

/// Errors from building or sending a contract call.
#[derive(Error, Debug)]
pub enum ClientError {
    /// No operation with this key in the contract.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// Call inputs failed the route's schemas. Nothing was sent.
    #[error("invalid input for '{key}': {} issue(s)", .errors.count())]
    InvalidInput { key: String, errors: InputErrors },

    /// The path template could not be filled.
    #[error("cannot build path for '{key}': {source}")]
    Path {
        key: String,
        #[source]
        source: PathError,
    },

    /// A header name or value is not valid HTTP.
    #[error("invalid header '{0}'")]
    InvalidHeader(String),

    /// The request URL could not be formed.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    /// The response body failed the declared response schema.
    #[error("response from {endpoint} (status {status}) failed validation: {source}")]
    ResponseValidation {
        endpoint: String,
        status: u16,
        #[source]
        source: ValidationError,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
