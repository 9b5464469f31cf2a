//! # Error Types
//!
//! Contract construction itself is total; errors only arise at the edges:
//! parsing documents, parsing method names, and filling path templates.

use accord_schema::SchemaError;
use thiserror::Error;

/// Failure to load a contract from a JSON or YAML document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The document is not valid JSON.
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is not valid YAML.
    #[error("invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The YAML document uses constructs with no JSON equivalent.
    #[error("YAML-to-JSON conversion failed: {0}")]
    Conversion(String),

    /// A node with `method` and `path` did not match the route shape.
    #[error("invalid route '{key}': {reason}")]
    InvalidRoute {
        /// Dotted key path of the route.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A tree node is neither a route nor a mapping of children.
    #[error("node '{key}' is neither a route nor a router")]
    InvalidNode {
        /// Dotted key path of the node.
        key: String,
    },

    /// A response map key is not an HTTP status code.
    #[error("invalid status code '{status}' at '{key}'")]
    InvalidStatus {
        /// Dotted key path of the route (or `options`).
        key: String,
        /// The offending map key.
        status: String,
    },

    /// A schema in the document failed to compile.
    #[error("schema error at '{key}': {source}")]
    Schema {
        /// Where the schema sits in the document.
        key: String,
        /// Compilation failure.
        #[source]
        source: SchemaError,
    },
}

/// An HTTP method outside the contract vocabulary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MethodError {
    #[error("unsupported HTTP method '{0}'")]
    Unsupported(String),
}

/// Failure to fill a path template with concrete parameter values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The template names a parameter the caller did not supply.
    #[error("missing path parameter '{0}'")]
    MissingParam(String),

    /// Parameter values must be strings, numbers or booleans.
    #[error("path parameter '{0}' must be a string, number or boolean")]
    NonScalar(String),
}
