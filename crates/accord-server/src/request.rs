//! # Requests
//!
//! [`IncomingRequest`] is the transport-neutral input to dispatch: the native
//! request parts, query and headers decoded into JSON values, and the raw
//! body. The body is decoded only after a route has matched, and never for
//! GET routes. [`ServerRequest`] is what a handler receives after validation.
//!
//! Decoding rules:
//!
//! - Header names are lowercase; repeated headers are joined with `", "`.
//! - Query values are strings; a repeated key collects into an array.
//! - An empty body is `{}`. JSON bodies are parsed, form bodies become an
//!   object, anything else is taken as text.

use std::sync::Arc;

use accord_core::Route;
use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use serde_json::{Map, Value};

use crate::error::BodyError;

/// A request ready for route matching and validation.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub parts: Arc<Parts>,
    pub query: Map<String, Value>,
    pub headers: Map<String, Value>,
    /// Undecoded body bytes.
    pub body: Bytes,
}

impl IncomingRequest {
    /// Decode query and headers from the native request. The body is kept
    /// as-is.
    pub fn from_parts(parts: Parts, body: impl Into<Bytes>) -> Self {
        let query = parse_query(parts.uri.query().unwrap_or_default());
        let headers = header_object(&parts.headers);
        Self {
            parts: Arc::new(parts),
            query,
            headers,
            body: body.into(),
        }
    }

    /// Decode the body according to the request's content type.
    ///
    /// # Errors
    ///
    /// [`BodyError`] when a JSON body is malformed or a text body is not
    /// UTF-8.
    pub fn decode_body(&self) -> Result<Value, BodyError> {
        parse_body(content_type(&self.parts.headers).as_deref(), &self.body)
    }

    pub fn method(&self) -> &str {
        self.parts.method.as_str()
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }
}

/// Validated inputs handed to a route handler.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    /// Dotted key of the matched route, e.g. `posts.getPost`.
    pub key: String,
    pub params: Value,
    pub query: Value,
    pub headers: Value,
    pub body: Value,
    /// The matched contract route.
    pub route: Arc<Route>,
    /// Native request parts (method, URI, raw headers, extensions).
    pub parts: Arc<Parts>,
}

impl ServerRequest {
    /// A validated path parameter.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// A validated (lowercase) header.
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(name)
    }
}

/// Decode a raw query string. Repeated keys collect into arrays.
pub fn parse_query(raw: &str) -> Map<String, Value> {
    let mut query = Map::new();
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        let value = Value::String(value.into_owned());
        match query.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                query.insert(key.into_owned(), value);
            }
        }
    }
    query
}

/// Parse each top-level query value as JSON, keeping the raw string when it
/// is not valid JSON. Array elements are parsed individually.
pub fn json_query(query: &Map<String, Value>) -> Map<String, Value> {
    query
        .iter()
        .map(|(key, value)| (key.clone(), parse_json_value(value)))
        .collect()
}

fn parse_json_value(value: &Value) -> Value {
    match value {
        Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|_| value.clone()),
        Value::Array(items) => Value::Array(items.iter().map(parse_json_value).collect()),
        other => other.clone(),
    }
}

/// Headers as a JSON object with lowercase keys.
pub fn header_object(headers: &HeaderMap) -> Map<String, Value> {
    let mut out = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        out.insert(name.as_str().to_ascii_lowercase(), Value::String(joined));
    }
    out
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = raw.split(';').next().unwrap_or_default().trim();
    Some(essence.to_ascii_lowercase())
}

/// Decode a request body according to its content type.
pub fn parse_body(content_type: Option<&str>, bytes: &[u8]) -> Result<Value, BodyError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    match content_type {
        None | Some("application/json") => Ok(serde_json::from_slice(bytes)?),
        Some(ct) if ct.ends_with("+json") => Ok(serde_json::from_slice(bytes)?),
        Some("application/x-www-form-urlencoded") => {
            let raw = std::str::from_utf8(bytes).map_err(|_| BodyError::Encoding)?;
            Ok(Value::Object(parse_query(raw)))
        }
        Some(_) => {
            let text = std::str::from_utf8(bytes).map_err(|_| BodyError::Encoding)?;
            Ok(Value::String(text.to_string()))
        }
    }
}
