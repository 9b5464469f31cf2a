//! # Routes
//!
//! A [`Route`] is one endpoint of a contract. Routes are plain values:
//! construct them with [`Route::get`], [`Route::post`], ... and the builder
//! methods below, then place them in a [`Router`](crate::Router).
//!
//! ```ignore
//! let get_post = Route::get("/posts/:id")
//!     .path_params(id_schema)
//!     .response(200, post_schema)
//!     .response(404, ResponseEntry::NoBody)
//!     .summary("Fetch a post");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use accord_schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MethodError;
use crate::path::PathTemplate;

/// HTTP methods a contract route can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Query routes carry no body; their body is never validated.
    pub fn is_query(self) -> bool {
        matches!(self, Self::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = MethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(MethodError::Unsupported(s.to_string())),
        }
    }
}

/// What a route returns for one status code.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEntry {
    /// Status line only; no body is written.
    NoBody,
    /// Declared status without a runtime schema; the body passes through.
    Untyped,
    /// JSON body described by a schema.
    Json(Schema),
    /// Non-JSON body with its own content type.
    Other {
        /// Content type sent with the response.
        content_type: String,
        /// Schema of the body value.
        body: Schema,
    },
}

impl ResponseEntry {
    /// Non-JSON response entry.
    pub fn other(content_type: impl Into<String>, body: Schema) -> Self {
        Self::Other {
            content_type: content_type.into(),
            body,
        }
    }

    /// The body schema, if this entry has one.
    pub fn schema(&self) -> Option<&Schema> {
        match self {
            Self::Json(schema) | Self::Other { body: schema, .. } => Some(schema),
            Self::NoBody | Self::Untyped => None,
        }
    }

    /// Content type override for `Other` entries.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Other { content_type, .. } => Some(content_type),
            _ => None,
        }
    }
}

impl From<Schema> for ResponseEntry {
    fn from(schema: Schema) -> Self {
        Self::Json(schema)
    }
}

/// One endpoint of a contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub method: Method,
    /// Path template; `:name` segments are parameters.
    pub path: String,
    pub path_params: Option<Schema>,
    pub query: Option<Schema>,
    pub headers: Option<Schema>,
    /// Request body schema. Ignored on query (GET) routes.
    pub body: Option<Schema>,
    /// Request content type override (defaults to JSON).
    pub content_type: Option<String>,
    pub responses: BTreeMap<u16, ResponseEntry>,
    pub strict_status_codes: Option<bool>,
    pub metadata: Option<Value>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deprecated: Option<bool>,
}

impl Route {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            path_params: None,
            query: None,
            headers: None,
            body: None,
            content_type: None,
            responses: BTreeMap::new(),
            strict_status_codes: None,
            metadata: None,
            summary: None,
            description: None,
            deprecated: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn path_params(mut self, schema: Schema) -> Self {
        self.path_params = Some(schema);
        self
    }

    pub fn query(mut self, schema: Schema) -> Self {
        self.query = Some(schema);
        self
    }

    pub fn headers(mut self, schema: Schema) -> Self {
        self.headers = Some(schema);
        self
    }

    pub fn body(mut self, schema: Schema) -> Self {
        self.body = Some(schema);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Declare the response for `status`. A later declaration for the same
    /// status replaces the earlier one.
    pub fn response(mut self, status: u16, entry: impl Into<ResponseEntry>) -> Self {
        self.responses.insert(status, entry.into());
        self
    }

    pub fn strict_status_codes(mut self, strict: bool) -> Self {
        self.strict_status_codes = Some(strict);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = Some(deprecated);
        self
    }

    /// Parsed form of [`Route::path`].
    pub fn template(&self) -> PathTemplate {
        PathTemplate::parse(&self.path)
    }

    /// Declared response entry for `status`.
    pub fn response_for(&self, status: u16) -> Option<&ResponseEntry> {
        self.responses.get(&status)
    }

    /// Whether undeclared status codes are a contract violation for this route.
    pub fn is_strict(&self) -> bool {
        self.strict_status_codes.unwrap_or(false)
    }

    /// Body schema that applies to incoming requests, `None` for query routes.
    pub fn effective_body(&self) -> Option<&Schema> {
        if self.method.is_query() {
            None
        } else {
            self.body.as_ref()
        }
    }
}
