//! # Compiled Schemas
//!
//! A [`Schema`] pairs a JSON Schema document with its compiled
//! `jsonschema::Validator`. Compilation happens once, at contract
//! construction time; request-time validation only runs the compiled form.
//!
//! ## Unknown-key policy
//!
//! The root `additionalProperties` keyword of an object schema decides what
//! happens to keys the schema does not declare:
//!
//! | `additionalProperties` | Policy                    | Validated output      |
//! |------------------------|---------------------------|-----------------------|
//! | `false`                | [`UnknownKeys::Strict`]      | rejected              |
//! | absent                 | [`UnknownKeys::Strip`]       | undeclared keys dropped |
//! | `true` / sub-schema    | [`UnknownKeys::Passthrough`] | undeclared keys kept  |
//!
//! ## Coercion
//!
//! A property schema carrying `"x-coerce": true` accepts the string form of
//! its declared `type` (`integer`, `number`, `boolean`). Path parameters
//! always arrive as strings, so this is how a contract asks for `/posts/:id`
//! to be validated as an integer.

use std::fmt;
use std::sync::Arc;

use jsonschema::{Draft, Validator};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Vendor keyword enabling string-to-scalar coercion on a property.
pub const COERCE_KEYWORD: &str = "x-coerce";

/// Error raised while constructing a [`Schema`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The document is neither a JSON object nor a boolean.
    #[error("schema document must be an object or a boolean, got {0}")]
    NotASchema(&'static str),

    /// The `jsonschema` crate rejected the document.
    #[error("schema failed to compile: {0}")]
    Compile(String),
}

/// How an object schema treats keys it does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownKeys {
    /// Undeclared keys fail validation.
    Strict,
    /// Undeclared keys are accepted and dropped from the validated output.
    Strip,
    /// Undeclared keys are accepted and kept.
    Passthrough,
}

impl UnknownKeys {
    /// Read the policy from a schema document's `additionalProperties`.
    pub fn of(document: &Value) -> Self {
        match document.get("additionalProperties") {
            Some(Value::Bool(false)) => Self::Strict,
            None => Self::Strip,
            Some(_) => Self::Passthrough,
        }
    }

    /// Render the policy back into an `additionalProperties` value.
    ///
    /// `Strip` is expressed by leaving the keyword out.
    pub fn keyword_value(self) -> Option<Value> {
        match self {
            Self::Strict => Some(Value::Bool(false)),
            Self::Strip => None,
            Self::Passthrough => Some(Value::Bool(true)),
        }
    }
}

/// A compiled, immutable, cheaply cloneable JSON Schema.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<Inner>,
}

struct Inner {
    document: Value,
    validator: Validator,
}

impl Schema {
    /// Compile a JSON Schema document (Draft 2020-12).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::NotASchema`] for non-object, non-boolean
    /// documents and [`SchemaError::Compile`] when the document is not a
    /// valid schema (e.g. `"type": 42`).
    pub fn new(document: Value) -> Result<Self, SchemaError> {
        match &document {
            Value::Object(_) | Value::Bool(_) => {}
            Value::Null => return Err(SchemaError::NotASchema("null")),
            Value::Number(_) => return Err(SchemaError::NotASchema("number")),
            Value::String(_) => return Err(SchemaError::NotASchema("string")),
            Value::Array(_) => return Err(SchemaError::NotASchema("array")),
        }

        let mut opts = jsonschema::options();
        opts.with_draft(Draft::Draft202012);
        let validator = opts
            .build(&document)
            .map_err(|e| SchemaError::Compile(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                document,
                validator,
            }),
        })
    }

    /// The source document.
    pub fn document(&self) -> &Value {
        &self.inner.document
    }

    pub(crate) fn validator(&self) -> &Validator {
        &self.inner.validator
    }

    /// Whether the document describes an object with declared properties.
    pub fn is_object_schema(&self) -> bool {
        let doc = self.document();
        doc.get("properties").is_some_and(Value::is_object)
            || doc.get("type").and_then(Value::as_str) == Some("object")
    }

    /// Unknown-key policy at the root of this schema.
    pub fn unknown_keys(&self) -> UnknownKeys {
        UnknownKeys::of(self.document())
    }

    /// Declared root properties, if any.
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.document().get("properties").and_then(Value::as_object)
    }

    /// Names listed in the root `required` array.
    pub fn required(&self) -> Vec<&str> {
        self.document()
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.document() == other.document()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("document", self.document())
            .finish()
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.document().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = Value::deserialize(deserializer)?;
        Schema::new(document).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compiles_object_schema() {
        let schema = Schema::new(json!({
            "type": "object",
            "properties": { "id": { "type": "string" } },
            "required": ["id"]
        }))
        .unwrap();
        assert!(schema.is_object_schema());
        assert_eq!(schema.required(), vec!["id"]);
        assert_eq!(schema.unknown_keys(), UnknownKeys::Strip);
    }

    #[test]
    fn rejects_non_schema_documents() {
        assert_eq!(
            Schema::new(json!("string")).unwrap_err(),
            SchemaError::NotASchema("string")
        );
        assert_eq!(
            Schema::new(Value::Null).unwrap_err(),
            SchemaError::NotASchema("null")
        );
    }

    #[test]
    fn rejects_invalid_keyword_values() {
        let err = Schema::new(json!({ "type": 42 })).unwrap_err();
        assert!(matches!(err, SchemaError::Compile(_)), "got: {err}");
    }

    #[test]
    fn boolean_schemas_compile() {
        let schema = Schema::new(json!(true)).unwrap();
        assert!(!schema.is_object_schema());
        assert!(schema.properties().is_none());
    }

    #[test]
    fn unknown_key_policy_follows_additional_properties() {
        assert_eq!(
            UnknownKeys::of(&json!({ "additionalProperties": false })),
            UnknownKeys::Strict
        );
        assert_eq!(
            UnknownKeys::of(&json!({ "additionalProperties": true })),
            UnknownKeys::Passthrough
        );
        assert_eq!(
            UnknownKeys::of(&json!({ "additionalProperties": { "type": "string" } })),
            UnknownKeys::Passthrough
        );
        assert_eq!(UnknownKeys::of(&json!({})), UnknownKeys::Strip);
    }

    #[test]
    fn equality_is_structural() {
        let a = Schema::new(json!({ "type": "string" })).unwrap();
        let b = Schema::new(json!({ "type": "string" })).unwrap();
        let c = Schema::new(json!({ "type": "number" })).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn deserializes_from_document() {
        let schema: Schema = serde_json::from_value(json!({ "type": "integer" })).unwrap();
        assert_eq!(schema.document(), &json!({ "type": "integer" }));

        let err = serde_json::from_value::<Schema>(json!(17)).unwrap_err();
        assert!(err.to_string().contains("number"));
    }
}
