//! # Server Error Types
//!
//! Three families:
//!
//! - [`BuildError`]: the implementation does not fit the contract. Raised
//!   once, when the [`Dispatcher`](crate::Dispatcher) is built.
//! - [`HandlerError`]: what a route handler may return instead of a response.
//! - [`DispatchError`]: a request that could not be served normally. Rendered
//!   by the configured [`ErrorHandler`] or by its own [`IntoResponse`] impl,
//!   which returns structured JSON bodies and never exposes internal error
//!   messages.

use std::sync::Arc;

use accord_schema::ValidationError;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Custom rendering for dispatch errors, given the failing request's parts.
pub type ErrorHandler = Arc<dyn Fn(&DispatchError, &Parts) -> Response + Send + Sync>;

/// The implementation tree does not match the contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A contract route has no handler.
    #[error("no handler registered for route '{key}'")]
    MissingHandler { key: String },

    /// A handler (or handler group) has no route in the contract.
    #[error("handler '{key}' does not correspond to any contract route")]
    UnknownHandler { key: String },

    /// Two routes accept exactly the same requests.
    #[error("routes '{first}' and '{second}' both match {method} {path}")]
    AmbiguousRoute {
        first: String,
        second: String,
        method: String,
        path: String,
    },
}

/// A "respond with this status and body" signal raised from a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub status: u16,
    pub body: Value,
}

/// Non-success outcome of a route handler.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Answer with this status and body, mapped like a normal response.
    #[error("handler responded with status {}", .0.status)]
    Respond(ResponseError),

    /// Any other failure. Rendered as a 500 unless an error handler is set.
    #[error("handler failed: {0}")]
    Unexpected(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn respond(status: u16, body: Value) -> Self {
        Self::Respond(ResponseError { status, body })
    }

    pub fn unexpected(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Unexpected(error.into())
    }
}

/// Per-source request validation failures. At least one field is set.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("request validation failed")]
pub struct RequestValidationError {
    pub path_parameter_errors: Option<ValidationError>,
    pub header_errors: Option<ValidationError>,
    pub query_parameter_errors: Option<ValidationError>,
    pub body_errors: Option<ValidationError>,
}

impl RequestValidationError {
    pub fn is_empty(&self) -> bool {
        self.path_parameter_errors.is_none()
            && self.header_errors.is_none()
            && self.query_parameter_errors.is_none()
            && self.body_errors.is_none()
    }

    /// Aggregate 400 body: every source present, `null` when it passed.
    pub fn body(&self) -> Value {
        json!({
            "pathParameterErrors": self.path_parameter_errors,
            "headerErrors": self.header_errors,
            "queryParameterErrors": self.query_parameter_errors,
            "bodyErrors": self.body_errors,
        })
    }
}

/// The request body could not be read or decoded.
#[derive(Error, Debug)]
pub enum BodyError {
    #[error("failed to read request body: {0}")]
    Read(String),

    #[error("malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request body is not valid UTF-8")]
    Encoding,

    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// A request that could not be served normally.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The request body could not be decoded (400), or was over the size
    /// limit (413).
    #[error("bad request: {0}")]
    MalformedBody(#[from] BodyError),

    /// Request inputs failed the route's schemas (400).
    #[error(transparent)]
    RequestValidation(#[from] RequestValidationError),

    /// The handler's response failed the declared schema (500).
    #[error("response for status {status} failed validation: {error}")]
    ResponseValidation { status: u16, error: ValidationError },

    /// The handler answered with a status outside 100..=999 (500).
    #[error("handler returned invalid status code {0}")]
    InvalidStatus(u16),

    /// The handler failed unexpectedly (500).
    #[error("handler failed: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "RESPONSE_VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only where they do not leak internals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl DispatchError {
    /// HTTP status and machine-readable error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::MalformedBody(BodyError::TooLarge { .. }) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE")
            }
            Self::MalformedBody(_) => (StatusCode::BAD_REQUEST, "MALFORMED_BODY"),
            Self::RequestValidation(_) => (StatusCode::BAD_REQUEST, "REQUEST_VALIDATION_ERROR"),
            Self::ResponseValidation { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "RESPONSE_VALIDATION_ERROR")
            }
            Self::InvalidStatus(_) | Self::Handler(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Same body as the non-throwing path.
        if let Self::RequestValidation(errors) = &self {
            return (status, Json(errors.body())).into_response();
        }

        let (message, details) = match &self {
            Self::ResponseValidation { error, .. } => (
                "response validation failed".to_string(),
                Some(json!({ "issues": error.issues })),
            ),
            Self::InvalidStatus(_) | Self::Handler(_) => {
                tracing::error!(error = %self, "internal server error");
                ("An internal error occurred".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
