//! # Implementation Registration
//!
//! An [`Implementation`] mirrors the contract tree: every contract route key
//! maps to a handler, every nested router key to a nested implementation.
//! The [`Dispatcher`](crate::Dispatcher) walks both trees once and fails the
//! build when they disagree.
//!
//! ```ignore
//! let implementation = Implementation::new()
//!     .handler("health", |_req| async { Ok(ServerResponse::ok(json!("ok"))) })
//!     .router("posts", Implementation::new().handler("getPost", get_post));
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::HandlerError;
use crate::request::ServerRequest;
use crate::response::ServerResponse;

/// Boxed future returned by [`RouteHandler::call`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<ServerResponse, HandlerError>> + Send>>;

/// An async function serving one contract route.
pub trait RouteHandler: Send + Sync + 'static {
    fn call(&self, request: ServerRequest) -> HandlerFuture;
}

impl<F, Fut> RouteHandler for F
where
    F: Fn(ServerRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ServerResponse, HandlerError>> + Send + 'static,
{
    fn call(&self, request: ServerRequest) -> HandlerFuture {
        Box::pin(self(request))
    }
}

/// A node of the implementation tree.
#[derive(Clone)]
pub enum ImplementationNode {
    Handler(Arc<dyn RouteHandler>),
    Router(Implementation),
}

impl std::fmt::Debug for ImplementationNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("Handler"),
            Self::Router(router) => f.debug_tuple("Router").field(router).finish(),
        }
    }
}

/// Handlers keyed like the contract they implement.
#[derive(Debug, Clone, Default)]
pub struct Implementation {
    children: IndexMap<String, ImplementationNode>,
}

impl Implementation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for the route under `key`.
    pub fn handler(mut self, key: impl Into<String>, handler: impl RouteHandler) -> Self {
        self.children
            .insert(key.into(), ImplementationNode::Handler(Arc::new(handler)));
        self
    }

    /// Register handlers for the nested router under `key`.
    pub fn router(mut self, key: impl Into<String>, implementation: Implementation) -> Self {
        self.children
            .insert(key.into(), ImplementationNode::Router(implementation));
        self
    }

    pub(crate) fn take(&mut self, key: &str) -> Option<ImplementationNode> {
        self.children.shift_remove(key)
    }

    pub(crate) fn remaining_keys(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
