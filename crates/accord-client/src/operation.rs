//! # Operations
//!
//! One [`Operation`] per contract route, keyed by its dotted key path. An
//! operation turns [`CallArgs`] into a [`PreparedRequest`]: inputs are
//! validated with the same validator the server uses, the path template is
//! filled, and the query is encoded.

use std::collections::BTreeMap;
use std::sync::Arc;

use accord_core::{Method, PathTemplate, Route};
use accord_schema::{validate, ValidateOptions};
use serde_json::{Map, Value};

use crate::error::{ClientError, InputErrors};
use crate::query::encode_query;

/// Inputs for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub params: Map<String, Value>,
    pub query: Map<String, Value>,
    pub headers: Map<String, Value>,
    pub body: Option<Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Header names are lowercased.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), Value::String(value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A validated, encoded request, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    /// Path with parameters filled in, without the query.
    pub path: String,
    /// Encoded query string, without `?`. Empty when there is no query.
    pub query: String,
    pub headers: BTreeMap<String, String>,
    /// Validated body; `None` for query routes.
    pub body: Option<Value>,
    /// Request content type (JSON unless the route overrides it).
    pub content_type: String,
}

impl PreparedRequest {
    /// Path plus query.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }
}

/// Client accessor for one contract route.
#[derive(Debug, Clone)]
pub struct Operation {
    key: String,
    route: Arc<Route>,
    template: PathTemplate,
}

impl Operation {
    pub fn new(key: impl Into<String>, route: Route) -> Self {
        let template = route.template();
        Self {
            key: key.into(),
            route: Arc::new(route),
            template,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Validate `args` and encode them into a request.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidInput`] listing every failing source.
    /// - [`ClientError::Path`] when a path parameter is missing or not a scalar.
    pub fn build_request(&self, args: &CallArgs, json_query: bool) -> Result<PreparedRequest, ClientError> {
        let route = &self.route;

        let params = validate(
            &Value::Object(args.params.clone()),
            route.path_params.as_ref(),
            ValidateOptions::PASS_THROUGH,
        );
        let headers = validate(
            &Value::Object(args.headers.clone()),
            route.headers.as_ref(),
            ValidateOptions::PASS_THROUGH,
        );
        let query = validate(
            &Value::Object(args.query.clone()),
            route.query.as_ref(),
            ValidateOptions::STRIP,
        );
        let body = match (route.method.is_query(), &args.body) {
            (true, _) => Ok(None),
            (false, body) => {
                let body = body.clone().unwrap_or_else(|| Value::Object(Map::new()));
                validate(&body, route.body.as_ref(), ValidateOptions::STRIP).map(Some)
            }
        };

        // Path values go out as given; the schema only checks them.
        let (headers, query, body) = match (params, headers, query, body) {
            (Ok(_), Ok(h), Ok(q), Ok(b)) => (h, q, b),
            (p, h, q, b) => {
                let errors = InputErrors {
                    path_parameter_errors: p.err(),
                    header_errors: h.err(),
                    query_parameter_errors: q.err(),
                    body_errors: b.err(),
                };
                return Err(ClientError::InvalidInput {
                    key: self.key.clone(),
                    errors,
                });
            }
        };

        let path = self
            .template
            .insert_params(&args.params)
            .map_err(|source| ClientError::Path {
                key: self.key.clone(),
                source,
            })?;

        let query = match query {
            Value::Object(map) => encode_query(&map, json_query),
            _ => String::new(),
        };

        let headers = match headers {
            Value::Object(map) => map
                .into_iter()
                .filter_map(|(name, value)| match value {
                    Value::String(s) => Some((name, s)),
                    Value::Null => None,
                    other => Some((name, other.to_string())),
                })
                .collect(),
            _ => BTreeMap::new(),
        };

        Ok(PreparedRequest {
            method: route.method,
            path,
            query,
            headers,
            body,
            content_type: route
                .content_type
                .clone()
                .unwrap_or_else(|| "application/json".to_string()),
        })
    }
}
