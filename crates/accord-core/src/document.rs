//! # Contract Documents
//!
//! Loads a contract from a JSON or YAML document:
//!
//! ```yaml
//! options:
//!   pathPrefix: /v1
//!   baseHeaders:
//!     type: object
//!     properties: { authorization: { type: string } }
//!   commonResponses:
//!     "500": { type: object, properties: { message: { type: string } } }
//! routes:
//!   posts:
//!     getPost:
//!       method: GET
//!       path: /posts/:id
//!       pathParams: { type: object, properties: { id: { type: integer, x-coerce: true } } }
//!       responses:
//!         "200": { type: object, properties: { title: { type: string } } }
//!         "404": null
//! ```
//!
//! A node is a route iff it has both `method` and `path`; any other mapping
//! is a router. Response values are `null` (no body), `{ contentType, body }`
//! (non-JSON body) or a JSON Schema. The document's `options` are resolved
//! onto the tree with [`build_router`].

use std::collections::BTreeMap;

use accord_schema::Schema;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::builder::build_router;
use crate::error::DocumentError;
use crate::route::{Method, ResponseEntry, Route};
use crate::router::{ContractNode, Router, RouterOptions};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawRoute {
    method: Method,
    path: String,
    #[serde(default)]
    path_params: Option<Schema>,
    #[serde(default)]
    query: Option<Schema>,
    #[serde(default)]
    headers: Option<Schema>,
    #[serde(default)]
    body: Option<Schema>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    responses: Map<String, Value>,
    #[serde(default)]
    strict_status_codes: Option<bool>,
    #[serde(default)]
    metadata: Option<Value>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    deprecated: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawOptions {
    #[serde(default)]
    base_headers: Option<Schema>,
    #[serde(default)]
    path_prefix: Option<String>,
    #[serde(default)]
    common_responses: Map<String, Value>,
    #[serde(default)]
    strict_status_codes: Option<bool>,
}

/// Parse a JSON contract document into a resolved router.
pub fn from_json_str(source: &str) -> Result<Router, DocumentError> {
    let value: Value = serde_json::from_str(source)?;
    from_value(value)
}

/// Parse a YAML contract document into a resolved router.
pub fn from_yaml_str(source: &str) -> Result<Router, DocumentError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(source)?;
    let value = yaml_to_json_value(&yaml).map_err(DocumentError::Conversion)?;
    from_value(value)
}

/// Build a resolved router from an already-parsed document.
pub fn from_value(document: Value) -> Result<Router, DocumentError> {
    let Value::Object(mut document) = document else {
        return Err(DocumentError::InvalidNode {
            key: "(root)".to_string(),
        });
    };

    let options = match document.remove("options") {
        Some(Value::Null) | None => RouterOptions::default(),
        Some(raw) => parse_options(raw)?,
    };

    let routes = match document.remove("routes") {
        Some(Value::Object(routes)) => routes,
        _ => {
            return Err(DocumentError::InvalidNode {
                key: "routes".to_string(),
            })
        }
    };
    if let Some(unknown) = document.keys().next() {
        return Err(DocumentError::InvalidNode {
            key: unknown.clone(),
        });
    }

    let tree = parse_router("", routes)?;
    Ok(build_router(&tree, &options))
}

fn parse_options(raw: Value) -> Result<RouterOptions, DocumentError> {
    let raw: RawOptions = serde_json::from_value(raw).map_err(|e| DocumentError::InvalidRoute {
        key: "options".to_string(),
        reason: e.to_string(),
    })?;
    Ok(RouterOptions {
        base_headers: raw.base_headers,
        path_prefix: raw.path_prefix,
        common_responses: parse_responses("options", raw.common_responses)?,
        strict_status_codes: raw.strict_status_codes,
    })
}

fn parse_router(prefix: &str, children: Map<String, Value>) -> Result<Router, DocumentError> {
    let mut router = Router::new();
    for (key, node) in children {
        let key_path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        let node = match node {
            Value::Object(map) if map.contains_key("method") && map.contains_key("path") => {
                ContractNode::Route(parse_route(&key_path, Value::Object(map))?)
            }
            Value::Object(map) => ContractNode::Router(parse_router(&key_path, map)?),
            _ => return Err(DocumentError::InvalidNode { key: key_path }),
        };
        router.insert(key, node);
    }
    Ok(router)
}

fn parse_route(key: &str, raw: Value) -> Result<Route, DocumentError> {
    let raw: RawRoute = serde_json::from_value(raw).map_err(|e| DocumentError::InvalidRoute {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Route {
        method: raw.method,
        path: raw.path,
        path_params: raw.path_params,
        query: raw.query,
        headers: raw.headers,
        body: raw.body,
        content_type: raw.content_type,
        responses: parse_responses(key, raw.responses)?,
        strict_status_codes: raw.strict_status_codes,
        metadata: raw.metadata,
        summary: raw.summary,
        description: raw.description,
        deprecated: raw.deprecated,
    })
}

fn parse_responses(
    key: &str,
    raw: Map<String, Value>,
) -> Result<BTreeMap<u16, ResponseEntry>, DocumentError> {
    let mut responses = BTreeMap::new();
    for (status, entry) in raw {
        let code = status
            .parse::<u16>()
            .ok()
            .filter(|code| (100..=599).contains(code))
            .ok_or_else(|| DocumentError::InvalidStatus {
                key: key.to_string(),
                status: status.clone(),
            })?;
        let location = format!("{key}.responses.{status}");
        responses.insert(code, parse_response_entry(&location, entry)?);
    }
    Ok(responses)
}

fn parse_response_entry(location: &str, entry: Value) -> Result<ResponseEntry, DocumentError> {
    let compile = |document: Value| {
        Schema::new(document).map_err(|source| DocumentError::Schema {
            key: location.to_string(),
            source,
        })
    };

    match entry {
        Value::Null => Ok(ResponseEntry::NoBody),
        Value::Object(mut map) if map.contains_key("contentType") && map.contains_key("body") => {
            let content_type = match map.remove("contentType") {
                Some(Value::String(ct)) => ct,
                _ => {
                    return Err(DocumentError::InvalidRoute {
                        key: location.to_string(),
                        reason: "contentType must be a string".to_string(),
                    })
                }
            };
            let body = compile(map.remove("body").unwrap_or(Value::Bool(true)))?;
            Ok(ResponseEntry::Other { content_type, body })
        }
        other => Ok(ResponseEntry::Json(compile(other)?)),
    }
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Integer and boolean map keys (e.g. unquoted `200:` status codes) are
/// converted to their string form.
fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>, String> = seq.iter().map(yaml_to_json_value).collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key type: {other:?}")),
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}
