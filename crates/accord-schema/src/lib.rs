//! # accord-schema: Schema Validation & Merging
//!
//! The leaf crate of the accord workspace. Every shape a contract declares
//! (path parameters, headers, query, body, responses) is a [`Schema`]: a
//! JSON Schema (Draft 2020-12) document compiled once by the `jsonschema`
//! crate and shared immutably afterwards.
//!
//! ## Validation (`validate`)
//!
//! [`validate()`] runs a value through an optional schema and returns the
//! *normalized* value: undeclared keys stripped, declared defaults applied,
//! `x-coerce` properties converted from their string form. An absent schema
//! is a pass-through and never fails.
//!
//! ## Merging (`merge`)
//!
//! [`merge()`] combines a base schema (router-level headers) with a more
//! specific one (route-level headers). Field definitions from the specific
//! schema win; strictness is preserved when either side is strict.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `accord-*` crates (this is the leaf of the DAG).
//! - No `.unwrap()` outside tests.
//! - Validation failures are values (`ValidationError`), never panics.

pub mod merge;
pub mod schema;
pub mod validate;

pub use merge::merge;
pub use schema::{Schema, SchemaError, UnknownKeys};
pub use validate::{
    validate, Issue, PathSegment, ValidateOptions, ValidationError, ValidationResult,
};
