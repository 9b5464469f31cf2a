//! # accord-core: Contract Model
//!
//! Defines what an API contract *is*: a tree of [`Router`]s whose leaves are
//! [`Route`]s. Each route declares its method, its path template, optional
//! schemas for path parameters, headers, query and body, and the response
//! shape for every status code it can return.
//!
//! ## Construction
//!
//! Contracts are built once, from literal structures, and never mutated.
//! [`build_router`] applies [`RouterOptions`] (base headers, path prefix,
//! common responses, strict status codes) to every route below a router and
//! returns a new, fully resolved tree:
//!
//! ```text
//! build_router(posts, { pathPrefix: "/posts" })      → /posts/:id
//! build_router({ posts }, { pathPrefix: "/v1" })      → /v1/posts/:id
//! ```
//!
//! Contracts can also be loaded from JSON or YAML documents ([`document`]).
//!
//! ## Crate Policy
//!
//! - Depends only on `accord-schema` internally.
//! - The builder is total: well-formed trees never fail to resolve.
//! - Path parameters are extracted as raw strings; typing them is the job
//!   of the route's `pathParams` schema.

pub mod builder;
pub mod document;
pub mod env;
pub mod error;
pub mod path;
pub mod route;
pub mod router;

pub use accord_schema::{Schema, SchemaError};
pub use builder::build_router;
pub use env::env_flag;
pub use error::{DocumentError, MethodError, PathError};
pub use path::{extract_params, split_path, PathTemplate, Segment, PARAM_MARKER};
pub use route::{Method, ResponseEntry, Route};
pub use router::{ContractNode, Router, RouterOptions};
