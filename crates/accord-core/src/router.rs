//! # Routers
//!
//! A [`Router`] is an ordered mapping from keys to routes or nested routers.
//! Definition order is preserved; it is the order in which dispatch
//! considers routes and in which clients list operations.

use std::collections::BTreeMap;

use accord_schema::Schema;
use indexmap::IndexMap;

use crate::builder::build_router;
use crate::route::{ResponseEntry, Route};

/// A node of the contract tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractNode {
    Route(Route),
    Router(Router),
}

/// A contract: keyed children, arbitrarily nested.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Router {
    children: IndexMap<String, ContractNode>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route under `key`.
    pub fn route(mut self, key: impl Into<String>, route: Route) -> Self {
        self.insert(key, ContractNode::Route(route));
        self
    }

    /// Add a nested router under `key`.
    pub fn router(mut self, key: impl Into<String>, router: Router) -> Self {
        self.insert(key, ContractNode::Router(router));
        self
    }

    /// Insert a node. Keys are unique per level: re-inserting a key replaces
    /// the node in place and returns the previous one.
    pub fn insert(&mut self, key: impl Into<String>, node: ContractNode) -> Option<ContractNode> {
        self.children.insert(key.into(), node)
    }

    pub fn get(&self, key: &str) -> Option<&ContractNode> {
        self.children.get(key)
    }

    /// Children in definition order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &ContractNode)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Find a route by dotted key path, e.g. `"posts.getPost"`.
    pub fn lookup(&self, key_path: &str) -> Option<&Route> {
        let mut current = self;
        let mut parts = key_path.split('.').peekable();
        while let Some(part) = parts.next() {
            match (current.children.get(part), parts.peek()) {
                (Some(ContractNode::Route(route)), None) => return Some(route),
                (Some(ContractNode::Router(next)), Some(_)) => current = next,
                _ => return None,
            }
        }
        None
    }

    /// All routes with their dotted key paths, depth-first in definition order.
    pub fn flatten(&self) -> Vec<(String, &Route)> {
        let mut out = Vec::new();
        self.collect_routes("", &mut out);
        out
    }

    fn collect_routes<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Route)>) {
        for (key, node) in &self.children {
            let key_path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match node {
                ContractNode::Route(route) => out.push((key_path, route)),
                ContractNode::Router(router) => router.collect_routes(&key_path, out),
            }
        }
    }

    /// Resolve `options` onto every route below this router.
    pub fn with_options(&self, options: &RouterOptions) -> Router {
        build_router(self, options)
    }
}

/// Options applied by [`build_router`] to every descendant route.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouterOptions {
    /// Merged under every route's own header schema.
    pub base_headers: Option<Schema>,
    /// Prepended to every route's path.
    pub path_prefix: Option<String>,
    /// Responses every route declares unless it declares the status itself.
    pub common_responses: BTreeMap<u16, ResponseEntry>,
    /// Default for routes that do not set `strict_status_codes`.
    pub strict_status_codes: Option<bool>,
}

impl RouterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_headers(mut self, schema: Schema) -> Self {
        self.base_headers = Some(schema);
        self
    }

    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    pub fn common_response(mut self, status: u16, entry: impl Into<ResponseEntry>) -> Self {
        self.common_responses.insert(status, entry.into());
        self
    }

    pub fn strict_status_codes(mut self, strict: bool) -> Self {
        self.strict_status_codes = Some(strict);
        self
    }
}
