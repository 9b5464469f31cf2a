//! Handler responses and the mapped responses dispatch sends back.

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

/// What a handler returns: a status code and a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerResponse {
    pub status: u16,
    pub body: Value,
}

impl ServerResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// 200 with `body`.
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// `status` with no body (mapped to an empty response for `NoBody` entries).
    pub fn empty(status: u16) -> Self {
        Self::new(status, Value::Null)
    }
}

/// Body of a mapped response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(Value),
    /// Non-JSON body sent verbatim with its declared content type.
    Raw { content_type: String, text: String },
}

/// A response after contract mapping (and validation, when enabled).
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingResponse {
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl OutgoingResponse {
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: ResponseBody::Empty,
        }
    }

    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: ResponseBody::Json(body),
        }
    }

    /// Strings are sent as-is; other values are serialized.
    pub fn raw(status: StatusCode, content_type: impl Into<String>, body: Value) -> Self {
        let text = match body {
            Value::String(text) => text,
            other => other.to_string(),
        };
        Self {
            status,
            body: ResponseBody::Raw {
                content_type: content_type.into(),
                text,
            },
        }
    }

    /// The JSON body, if any.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(body) => Some(body),
            _ => None,
        }
    }
}

impl IntoResponse for OutgoingResponse {
    fn into_response(self) -> Response {
        match self.body {
            ResponseBody::Empty => self.status.into_response(),
            ResponseBody::Json(body) => (self.status, Json(body)).into_response(),
            ResponseBody::Raw { content_type, text } => {
                (self.status, [(CONTENT_TYPE, content_type)], text).into_response()
            }
        }
    }
}
