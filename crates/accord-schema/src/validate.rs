//! # Value Validation
//!
//! Runs request and response values through an optional [`Schema`].
//!
//! ## Pipeline
//!
//! 1. **Coerce.** String values under `"x-coerce": true` properties are
//!    converted to the declared scalar type.
//! 2. **Validate.** The compiled validator reports every violation; each
//!    becomes an [`Issue`] addressed by an ordered path of keys and indices.
//! 3. **Normalize.** On success, undeclared keys are stripped (unless the
//!    schema keeps them) and defaults of absent properties are filled in.
//! 4. **Overlay.** With [`ValidateOptions::pass_through_extra_keys`], the
//!    normalized keys are laid over the original object so that keys the
//!    transport injected survive. Path parameters and headers validate this
//!    way; query and body do not.
//!
//! An absent schema always succeeds and returns the input unchanged.

use std::fmt;

use jsonschema::error::ValidationErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{Schema, UnknownKeys, COERCE_KEYWORD};

/// Outcome of [`validate`]: the normalized value or the collected issues.
pub type ValidationResult = Result<Value, ValidationError>;

/// Options for a single [`validate`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Keep keys of the input object that the schema does not declare.
    pub pass_through_extra_keys: bool,
}

impl ValidateOptions {
    /// Validated output only (query, body, responses).
    pub const STRIP: Self = Self {
        pass_through_extra_keys: false,
    };

    /// Validated keys laid over the original object (path params, headers).
    pub const PASS_THROUGH: Self = Self {
        pass_through_extra_keys: true,
    };
}

/// One step in the path to an offending value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "[{i}]"),
            Self::Key(k) => f.write_str(k),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A single validation issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Ordered keys/indices from the validated root to the offending value.
    pub path: Vec<PathSegment>,
    /// The JSON Schema keyword that failed (`required`, `type`, ...).
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl Issue {
    /// Dotted rendering of the path, `(root)` for the empty path.
    pub fn path_string(&self) -> String {
        if self.path.is_empty() {
            return "(root)".to_string();
        }
        let mut out = String::new();
        for segment in &self.path {
            if matches!(segment, PathSegment::Key(_)) && !out.is_empty() {
                out.push('.');
            }
            out.push_str(&segment.to_string());
        }
        out
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.path_string(), self.code, self.message)
    }
}

/// Structured validation failure: `{ "issues": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub issues: Vec<Issue>,
}

impl ValidationError {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    /// A failure with exactly one issue.
    pub fn single(path: Vec<PathSegment>, code: &str, message: impl Into<String>) -> Self {
        Self {
            issues: vec![Issue {
                path,
                code: code.to_string(),
                message: message.into(),
            }],
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation issue(s)", self.issues.len())?;
        for (i, issue) in self.issues.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { "; " })?;
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Validate `data` against an optional schema.
///
/// # Errors
///
/// Returns every issue the compiled validator reports; validation is not
/// short-circuited on the first failing keyword.
pub fn validate(data: &Value, schema: Option<&Schema>, options: ValidateOptions) -> ValidationResult {
    let Some(schema) = schema else {
        return Ok(data.clone());
    };

    let candidate = coerce(data, schema.document());
    let issues: Vec<Issue> = schema
        .validator()
        .iter_errors(&candidate)
        .flat_map(|error| issues_from(&error, &candidate))
        .collect();
    if !issues.is_empty() {
        return Err(ValidationError { issues });
    }

    let normalized = normalize(candidate, schema.document());
    if options.pass_through_extra_keys {
        if let (Value::Object(original), Value::Object(validated)) = (data, &normalized) {
            let mut overlaid = original.clone();
            for (key, value) in validated {
                overlaid.insert(key.clone(), value.clone());
            }
            return Ok(Value::Object(overlaid));
        }
    }
    Ok(normalized)
}

fn issues_from(error: &jsonschema::ValidationError<'_>, instance: &Value) -> Vec<Issue> {
    let path = pointer_to_path(&error.instance_path.to_string(), instance);
    let code = keyword_of(&error.schema_path.to_string());

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let mut path = path;
            if let Some(name) = property.as_str() {
                path.push(PathSegment::Key(name.to_string()));
            }
            vec![Issue {
                path,
                code,
                message: error.to_string(),
            }]
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
            .iter()
            .map(|key| {
                let mut path = path.clone();
                path.push(PathSegment::Key(key.clone()));
                Issue {
                    path,
                    code: code.clone(),
                    message: format!("unrecognized key '{key}'"),
                }
            })
            .collect(),
        _ => vec![Issue {
            path,
            code,
            message: error.to_string(),
        }],
    }
}

/// Last token of the schema location, i.e. the keyword that failed.
fn keyword_of(schema_pointer: &str) -> String {
    schema_pointer
        .rsplit('/')
        .next()
        .filter(|token| !token.is_empty())
        .map(unescape_token)
        .unwrap_or_else(|| "invalid".to_string())
}

/// Convert a JSON Pointer into path segments, walking the instance to tell
/// array indices apart from numeric object keys.
fn pointer_to_path(pointer: &str, instance: &Value) -> Vec<PathSegment> {
    let mut current = Some(instance);
    let mut path = Vec::new();
    for raw in pointer.split('/').skip(1) {
        let token = unescape_token(raw);
        let segment = match current {
            Some(Value::Array(_)) => token
                .parse::<usize>()
                .map(PathSegment::Index)
                .unwrap_or(PathSegment::Key(token)),
            _ => PathSegment::Key(token),
        };
        current = match (&segment, current) {
            (PathSegment::Index(i), Some(Value::Array(items))) => items.get(*i),
            (PathSegment::Key(k), Some(Value::Object(map))) => map.get(k),
            _ => None,
        };
        path.push(segment);
    }
    path
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn coerce(value: &Value, schema: &Value) -> Value {
    match value {
        Value::String(raw) if schema.get(COERCE_KEYWORD) == Some(&Value::Bool(true)) => {
            coerce_scalar(raw, schema).unwrap_or_else(|| value.clone())
        }
        Value::Object(map) => {
            let properties = schema.get("properties").and_then(Value::as_object);
            let additional = schema.get("additionalProperties").filter(|s| s.is_object());
            Value::Object(
                map.iter()
                    .map(|(key, child)| {
                        let child_schema = properties.and_then(|p| p.get(key)).or(additional);
                        let coerced = match child_schema {
                            Some(s) => coerce(child, s),
                            None => child.clone(),
                        };
                        (key.clone(), coerced)
                    })
                    .collect(),
            )
        }
        Value::Array(items) => match schema.get("items") {
            Some(item_schema) if item_schema.is_object() => {
                Value::Array(items.iter().map(|i| coerce(i, item_schema)).collect())
            }
            _ => value.clone(),
        },
        _ => value.clone(),
    }
}

fn coerce_scalar(raw: &str, schema: &Value) -> Option<Value> {
    let types: Vec<&str> = match schema.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    let trimmed = raw.trim();
    for ty in types {
        match ty {
            "integer" => {
                if let Ok(n) = trimmed.parse::<i64>() {
                    return Some(Value::from(n));
                }
            }
            "number" => {
                if let Ok(n) = trimmed.parse::<i64>() {
                    return Some(Value::from(n));
                }
                if let Some(n) = trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                {
                    return Some(Value::Number(n));
                }
            }
            "boolean" => match trimmed {
                "true" => return Some(Value::Bool(true)),
                "false" => return Some(Value::Bool(false)),
                _ => {}
            },
            "string" => return None,
            _ => {}
        }
    }
    None
}

/// Combinators and references are left untouched: which branch declared a
/// key is not known without re-running the validator per branch.
fn is_composite(schema: &Value) -> bool {
    ["$ref", "allOf", "anyOf", "oneOf", "if"]
        .iter()
        .any(|keyword| schema.get(*keyword).is_some())
}

fn normalize(value: Value, schema: &Value) -> Value {
    if is_composite(schema) {
        return value;
    }
    match value {
        Value::Object(map) => {
            let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
                return Value::Object(map);
            };
            let keep_undeclared = UnknownKeys::of(schema) != UnknownKeys::Strip
                || schema.get("patternProperties").is_some();

            let mut out = Map::new();
            for (key, child) in map {
                match properties.get(&key) {
                    Some(child_schema) => {
                        let child = normalize(child, child_schema);
                        out.insert(key, child);
                    }
                    None if keep_undeclared => {
                        out.insert(key, child);
                    }
                    None => {}
                }
            }
            for (key, child_schema) in properties {
                if out.contains_key(key) {
                    continue;
                }
                if let Some(default) = child_schema.get("default") {
                    out.insert(key.clone(), default.clone());
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => match schema.get("items") {
            Some(item_schema) if item_schema.is_object() => Value::Array(
                items
                    .into_iter()
                    .map(|i| normalize(i, item_schema))
                    .collect(),
            ),
            _ => Value::Array(items),
        },
        other => other,
    }
}
