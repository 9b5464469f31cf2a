//! # accord-client: Typed client for accord contracts
//!
//! Walks a resolved contract once and exposes one [`Operation`] per route,
//! keyed by its dotted key path (`posts.getPost`). A call validates its
//! inputs with the same schemas the server enforces, fills the path
//! template, encodes the query, and sends the request with `reqwest`.
//!
//! ```ignore
//! let client = Client::new(&contract, ClientConfig::from_env()?)?;
//! let post = client
//!     .call("posts.getPost", CallArgs::new().param("id", 1))
//!     .await?;
//! ```
//!
//! ## Query Encoding
//!
//! Plain mode sends `key[sub]=v` pairs and repeats keys for arrays. JSON mode
//! (`ClientConfig::json_query`) sends each value as JSON text, matching a
//! server configured with `json_query`.

pub mod client;
pub mod config;
pub mod error;
pub mod operation;
pub mod query;

pub use client::{Client, ClientResponse};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, InputErrors};
pub use operation::{CallArgs, Operation, PreparedRequest};
pub use query::encode_query;
