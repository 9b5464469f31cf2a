//! In-memory posts service implementing the demo contract.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use accord_server::{HandlerError, Implementation, RouteHandler, ServerRequest, ServerResponse};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use parking_lot::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub published: bool,
}

#[derive(Debug, Deserialize)]
struct NewPost {
    title: String,
    body: String,
    tags: Vec<String>,
    published: bool,
}

#[derive(Debug, Default, Deserialize)]
struct PostPatch {
    title: Option<String>,
    body: Option<String>,
    tags: Option<Vec<String>>,
    published: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    take: usize,
    tag: Option<String>,
}

#[derive(Debug, Default)]
struct Posts {
    next_id: u64,
    by_id: BTreeMap<u64, Post>,
}

/// Shared post storage. Locks are never held across `.await`.
#[derive(Debug, Default)]
pub struct PostStore {
    inner: RwLock<Posts>,
}

impl PostStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, new: NewPost) -> Post {
        let mut posts = self.inner.write();
        posts.next_id += 1;
        let post = Post {
            id: posts.next_id,
            title: new.title,
            body: new.body,
            tags: new.tags,
            published: new.published,
        };
        posts.by_id.insert(post.id, post.clone());
        post
    }

    fn get(&self, id: u64) -> Option<Post> {
        self.inner.read().by_id.get(&id).cloned()
    }

    /// Newest first.
    fn list(&self, take: usize, tag: Option<&str>) -> Vec<Post> {
        let posts = self.inner.read();
        posts
            .by_id
            .values()
            .rev()
            .filter(|post| tag.map_or(true, |tag| post.tags.iter().any(|t| t == tag)))
            .take(take)
            .cloned()
            .collect()
    }

    fn update(&self, id: u64, patch: PostPatch) -> Option<Post> {
        let mut posts = self.inner.write();
        let post = posts.by_id.get_mut(&id)?;
        if let Some(title) = patch.title {
            post.title = title;
        }
        if let Some(body) = patch.body {
            post.body = body;
        }
        if let Some(tags) = patch.tags {
            post.tags = tags;
        }
        if let Some(published) = patch.published {
            post.published = published;
        }
        Some(post.clone())
    }

    fn remove(&self, id: u64) -> bool {
        self.inner.write().by_id.remove(&id).is_some()
    }
}

/// Handlers for every route of the demo contract.
pub fn implementation(store: Arc<PostStore>) -> Implementation {
    Implementation::new()
        .handler("health", health)
        .router(
            "posts",
            Implementation::new()
                .handler("listPosts", with_store(&store, list_posts))
                .handler("getPost", with_store(&store, get_post))
                .handler("exportPost", with_store(&store, export_post))
                .handler("createPost", with_store(&store, create_post))
                .handler("updatePost", with_store(&store, update_post))
                .handler("deletePost", with_store(&store, delete_post)),
        )
}

fn with_store<F, Fut>(store: &Arc<PostStore>, handler: F) -> impl RouteHandler
where
    F: Fn(Arc<PostStore>, ServerRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ServerResponse, HandlerError>> + Send + 'static,
{
    let store = Arc::clone(store);
    move |req: ServerRequest| handler(Arc::clone(&store), req)
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, HandlerError> {
    serde_json::from_value(value.clone()).map_err(HandlerError::unexpected)
}

fn post_id(req: &ServerRequest) -> Result<u64, HandlerError> {
    req.param("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| HandlerError::respond(404, Value::Null))
}

fn to_body(post: &Post) -> Result<Value, HandlerError> {
    serde_json::to_value(post).map_err(HandlerError::unexpected)
}

async fn health(_req: ServerRequest) -> Result<ServerResponse, HandlerError> {
    Ok(ServerResponse::ok(json!({ "status": "ok" })))
}

async fn list_posts(store: Arc<PostStore>, req: ServerRequest) -> Result<ServerResponse, HandlerError> {
    let query: ListQuery = decode(&req.query)?;
    let posts = store.list(query.take, query.tag.as_deref());
    Ok(ServerResponse::ok(json!({ "posts": posts })))
}

async fn get_post(store: Arc<PostStore>, req: ServerRequest) -> Result<ServerResponse, HandlerError> {
    match store.get(post_id(&req)?) {
        Some(post) => Ok(ServerResponse::ok(to_body(&post)?)),
        None => Ok(ServerResponse::empty(404)),
    }
}

async fn export_post(store: Arc<PostStore>, req: ServerRequest) -> Result<ServerResponse, HandlerError> {
    let post = store
        .get(post_id(&req)?)
        .ok_or_else(|| HandlerError::respond(404, Value::Null))?;
    let markdown = format!("# {}\n\n{}\n", post.title, post.body);
    Ok(ServerResponse::ok(Value::String(markdown)))
}

async fn create_post(store: Arc<PostStore>, req: ServerRequest) -> Result<ServerResponse, HandlerError> {
    let post = store.insert(decode(&req.body)?);
    tracing::info!(id = post.id, "post created");
    Ok(ServerResponse::new(201, to_body(&post)?))
}

async fn update_post(store: Arc<PostStore>, req: ServerRequest) -> Result<ServerResponse, HandlerError> {
    let id = post_id(&req)?;
    match store.update(id, decode(&req.body)?) {
        Some(post) => Ok(ServerResponse::ok(to_body(&post)?)),
        None => Ok(ServerResponse::empty(404)),
    }
}

async fn delete_post(store: Arc<PostStore>, req: ServerRequest) -> Result<ServerResponse, HandlerError> {
    let id = post_id(&req)?;
    if store.remove(id) {
        tracing::info!(id, "post deleted");
        Ok(ServerResponse::empty(204))
    } else {
        Ok(ServerResponse::empty(404))
    }
}
