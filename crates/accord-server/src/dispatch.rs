//! # Request Validation & Dispatch
//!
//! A [`Dispatcher`] is built once from a resolved contract and an
//! [`Implementation`], then shared across tasks. Every request runs through:
//!
//! ```text
//! ROUTE_MATCHING → VALIDATING → INVOKING → RESPONSE_MAPPING → (RESPONSE_VALIDATING) → DONE
//!       │               │
//!       └─ 404          └─ 400 aggregate (or DispatchError::RequestValidation)
//! ```
//!
//! ## Matching
//!
//! The request path is split into non-empty, percent-decoded segments. A
//! route matches when its method equals the request method, its template has
//! the same number of segments, and every literal segment is equal. When
//! several routes match, the one with the most literal segments wins; ties go
//! to definition order. Routes that would always tie (same method, same
//! shape) are rejected at build time.
//!
//! ## Validation
//!
//! Path parameters, headers, query and body are all validated before any
//! failure is reported, so a 400 lists every failing source at once. Path
//! parameters and headers keep undeclared keys; query and body do not. The
//! body of a GET route is never validated.
//!
//! ## Responses
//!
//! The handler's status selects the declared response entry. `NoBody` entries
//! send the status line only, `Other` entries their own content type, and
//! everything else JSON. With response validation on, the body is validated
//! against the entry's schema and the normalized value is sent; a failure is
//! a [`DispatchError::ResponseValidation`] and the invalid body is dropped.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

use accord_core::{ContractNode, Method, PathTemplate, ResponseEntry, Route, Router};
use accord_schema::{validate, ValidateOptions};
use axum::body::Bytes;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

use crate::config::EngineConfig;
use crate::error::{BuildError, DispatchError, ErrorHandler, HandlerError, RequestValidationError};
use crate::implementation::{Implementation, ImplementationNode, RouteHandler};
use crate::request::{json_query, IncomingRequest, ServerRequest};
use crate::response::{OutgoingResponse, ServerResponse};

/// A contract route bound to its handler.
#[derive(Clone)]
pub struct BoundRoute {
    pub key: String,
    pub route: Arc<Route>,
    template: PathTemplate,
    handler: Arc<dyn RouteHandler>,
}

impl std::fmt::Debug for BoundRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundRoute")
            .field("key", &self.key)
            .field("method", &self.route.method)
            .field("path", &self.route.path)
            .finish()
    }
}

/// A matched route with its raw path parameters.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub bound: &'a BoundRoute,
    pub params: BTreeMap<String, String>,
}

/// Serves requests against a resolved contract.
#[derive(Clone)]
pub struct Dispatcher {
    routes: Vec<BoundRoute>,
    config: EngineConfig,
    error_handler: Option<ErrorHandler>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes)
            .field("config", &self.config)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

impl Dispatcher {
    /// Bind every contract route to its handler.
    ///
    /// # Errors
    ///
    /// - [`BuildError::MissingHandler`] for a route without a handler.
    /// - [`BuildError::UnknownHandler`] for a handler without a route.
    /// - [`BuildError::AmbiguousRoute`] for two routes with the same method
    ///   and the same path shape.
    pub fn new(
        contract: &Router,
        mut implementation: Implementation,
        config: EngineConfig,
    ) -> Result<Self, BuildError> {
        let mut routes = Vec::new();
        bind(contract, &mut implementation, "", &mut routes)?;
        check_ambiguity(&routes)?;
        tracing::debug!(routes = routes.len(), ?config, "dispatcher built");
        Ok(Self {
            routes,
            config,
            error_handler: None,
        })
    }

    /// Render every [`DispatchError`] with `handler` instead of the default
    /// JSON error bodies.
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&DispatchError, &Parts) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Bound routes in definition order.
    pub fn routes(&self) -> &[BoundRoute] {
        &self.routes
    }

    /// Find the route serving `method` + `path`.
    pub fn match_route(&self, method: &str, path: &str) -> Option<RouteMatch<'_>> {
        let method: Method = method.parse().ok()?;
        // A segment that does not decode to UTF-8 matches nothing.
        let decoded: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| percent_decode_str(s).decode_utf8().ok().map(|s| s.into_owned()))
            .collect::<Option<_>>()?;
        let segments: Vec<&str> = decoded.iter().map(String::as_str).collect();

        // min_by_key keeps the first of equal candidates.
        let bound = self
            .routes
            .iter()
            .filter(|b| b.route.method == method && b.template.matches(&segments))
            .min_by_key(|b| Reverse(b.template.literal_count()))?;
        Some(RouteMatch {
            bound,
            params: bound.template.extract(&segments),
        })
    }

    /// Serve one request.
    ///
    /// An unmatched request is a 404 with no body, and a request validation
    /// failure is a 400 unless `throw_request_validation` is set. The body is
    /// decoded only once a route has matched, and never for GET routes.
    ///
    /// # Errors
    ///
    /// [`DispatchError`] for undecodable bodies of matched routes, thrown
    /// request validation failures, response validation failures, invalid
    /// status codes and unexpected handler errors.
    pub async fn dispatch(&self, request: IncomingRequest) -> Result<OutgoingResponse, DispatchError> {
        let Some(RouteMatch { bound, params }) = self.match_route(request.method(), request.path())
        else {
            tracing::debug!(method = request.method(), path = request.path(), "no route matched");
            return Ok(OutgoingResponse::empty(StatusCode::NOT_FOUND));
        };
        tracing::debug!(route = %bound.key, method = request.method(), path = request.path(), "route matched");

        let body = if bound.route.method.is_query() {
            Value::Object(Map::new())
        } else {
            request.decode_body()?
        };

        let server_request = match self.validate_request(bound, params, request, body) {
            Ok(server_request) => server_request,
            Err(errors) if self.config.throw_request_validation => {
                return Err(DispatchError::RequestValidation(errors));
            }
            Err(errors) => {
                return Ok(OutgoingResponse::json(StatusCode::BAD_REQUEST, errors.body()));
            }
        };

        let response = match bound.handler.call(server_request).await {
            Ok(response) => response,
            Err(HandlerError::Respond(signal)) => ServerResponse::new(signal.status, signal.body),
            Err(HandlerError::Unexpected(error)) => {
                tracing::error!(route = %bound.key, error = %error, "handler failed");
                return Err(DispatchError::Handler(error));
            }
        };

        self.map_response(bound, response)
    }

    /// Dispatch and render a native request.
    pub async fn handle(&self, parts: Parts, body: Bytes) -> Response {
        let request = IncomingRequest::from_parts(parts, body);
        let parts = Arc::clone(&request.parts);
        match self.dispatch(request).await {
            Ok(response) => response.into_response(),
            Err(error) => self.render_error(error, &parts),
        }
    }

    /// Render `error` with the configured error handler, else the default.
    pub fn render_error(&self, error: DispatchError, parts: &Parts) -> Response {
        match &self.error_handler {
            Some(handler) => handler(&error, parts),
            None => error.into_response(),
        }
    }

    fn validate_request(
        &self,
        bound: &BoundRoute,
        params: BTreeMap<String, String>,
        request: IncomingRequest,
        body: Value,
    ) -> Result<ServerRequest, RequestValidationError> {
        let route = &bound.route;
        let raw_params: Map<String, Value> = params
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();
        let raw_query = if self.config.json_query {
            json_query(&request.query)
        } else {
            request.query
        };

        let params = validate(
            &Value::Object(raw_params),
            route.path_params.as_ref(),
            ValidateOptions::PASS_THROUGH,
        );
        let headers = validate(
            &Value::Object(request.headers),
            route.headers.as_ref(),
            ValidateOptions::PASS_THROUGH,
        );
        let query = validate(
            &Value::Object(raw_query),
            route.query.as_ref(),
            ValidateOptions::STRIP,
        );
        let body = match route.effective_body() {
            Some(schema) => validate(&body, Some(schema), ValidateOptions::STRIP),
            None => Ok(body),
        };

        match (params, headers, query, body) {
            (Ok(params), Ok(headers), Ok(query), Ok(body)) => Ok(ServerRequest {
                key: bound.key.clone(),
                params,
                query,
                headers,
                body,
                route: Arc::clone(&bound.route),
                parts: request.parts,
            }),
            (params, headers, query, body) => {
                let errors = RequestValidationError {
                    path_parameter_errors: params.err(),
                    header_errors: headers.err(),
                    query_parameter_errors: query.err(),
                    body_errors: body.err(),
                };
                tracing::debug!(route = %bound.key, error = ?errors, "request validation failed");
                Err(errors)
            }
        }
    }

    fn map_response(
        &self,
        bound: &BoundRoute,
        response: ServerResponse,
    ) -> Result<OutgoingResponse, DispatchError> {
        let ServerResponse { status, body } = response;
        let code = StatusCode::from_u16(status).map_err(|_| DispatchError::InvalidStatus(status))?;
        let entry = bound.route.response_for(status);

        if entry.is_none() && bound.route.is_strict() {
            tracing::warn!(route = %bound.key, status, "status code not declared by the contract");
        }

        let body = match entry.and_then(ResponseEntry::schema) {
            Some(schema) if self.config.response_validation => {
                validate(&body, Some(schema), ValidateOptions::STRIP).map_err(|error| {
                    tracing::error!(route = %bound.key, status, %error, "response validation failed");
                    DispatchError::ResponseValidation { status, error }
                })?
            }
            _ => body,
        };

        Ok(match entry {
            Some(ResponseEntry::NoBody) => OutgoingResponse::empty(code),
            Some(ResponseEntry::Other { content_type, .. }) => {
                OutgoingResponse::raw(code, content_type.clone(), body)
            }
            Some(ResponseEntry::Json(_) | ResponseEntry::Untyped) | None => {
                OutgoingResponse::json(code, body)
            }
        })
    }
}

fn bind(
    contract: &Router,
    implementation: &mut Implementation,
    prefix: &str,
    out: &mut Vec<BoundRoute>,
) -> Result<(), BuildError> {
    for (key, node) in contract.children() {
        let key_path = join_key(prefix, key);
        match (node, implementation.take(key)) {
            (ContractNode::Route(route), Some(ImplementationNode::Handler(handler))) => {
                out.push(BoundRoute {
                    key: key_path,
                    route: Arc::new(route.clone()),
                    template: route.template(),
                    handler,
                });
            }
            (ContractNode::Route(_), _) => return Err(BuildError::MissingHandler { key: key_path }),
            (ContractNode::Router(sub), Some(ImplementationNode::Router(mut sub_impl))) => {
                bind(sub, &mut sub_impl, &key_path, out)?;
            }
            (ContractNode::Router(sub), None) => {
                bind(sub, &mut Implementation::new(), &key_path, out)?;
            }
            (ContractNode::Router(_), Some(ImplementationNode::Handler(_))) => {
                return Err(BuildError::UnknownHandler { key: key_path });
            }
        }
    }
    if let Some(extra) = implementation.remaining_keys().next() {
        return Err(BuildError::UnknownHandler {
            key: join_key(prefix, extra),
        });
    }
    Ok(())
}

fn check_ambiguity(routes: &[BoundRoute]) -> Result<(), BuildError> {
    for (i, first) in routes.iter().enumerate() {
        for second in &routes[i + 1..] {
            if first.route.method == second.route.method
                && first.template.same_shape(&second.template)
            {
                return Err(BuildError::AmbiguousRoute {
                    first: first.key.clone(),
                    second: second.key.clone(),
                    method: first.route.method.to_string(),
                    path: second.route.path.clone(),
                });
            }
        }
    }
    Ok(())
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
