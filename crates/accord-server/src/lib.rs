//! # accord-server: Contract Dispatch
//!
//! Serves a resolved accord contract. Handlers are registered in an
//! [`Implementation`] tree shaped like the contract; a [`Dispatcher`] binds
//! the two once and then, per request, matches the route, validates every
//! input against the route's schemas, invokes the handler, and maps (and
//! optionally validates) the response.
//!
//! ## Module Layout
//!
//! | Module             | Concern                                           |
//! |--------------------|---------------------------------------------------|
//! | [`config`]         | [`EngineConfig`] flags, loaded from env vars       |
//! | [`implementation`] | Handler trait and registration tree                |
//! | [`request`]        | Request decoding (query, headers, body)            |
//! | [`dispatch`]       | Route matching, validation, invocation, mapping    |
//! | [`response`]       | Handler responses and mapped responses             |
//! | [`error`]          | Build, handler and dispatch errors                 |
//! | [`transport`]      | Axum fallback router wrapped in `TraceLayer`       |
//!
//! ## Crate Policy
//!
//! - The dispatcher is immutable after construction and shared behind `Arc`.
//! - Internal error messages never reach response bodies.
//! - No `.unwrap()` outside tests.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod implementation;
pub mod request;
pub mod response;
pub mod transport;

pub use config::EngineConfig;
pub use dispatch::{BoundRoute, Dispatcher, RouteMatch};
pub use error::{
    BodyError, BuildError, DispatchError, ErrorBody, ErrorDetail, ErrorHandler, HandlerError,
    RequestValidationError, ResponseError,
};
pub use implementation::{HandlerFuture, Implementation, ImplementationNode, RouteHandler};
pub use request::{IncomingRequest, ServerRequest};
pub use response::{OutgoingResponse, ResponseBody, ServerResponse};
pub use transport::router;
