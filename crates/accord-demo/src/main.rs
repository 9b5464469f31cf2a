//! # accord-demo: Binary Entry Point
//!
//! Serves the posts contract in `contract.yaml` from an in-memory store.
//! Binds to configurable port (default 8080). Set `ACCORD_CONTRACT` to load
//! a different contract document; it must keep the same route keys.

mod posts;

use std::sync::Arc;

use accord_server::{Dispatcher, EngineConfig};
use anyhow::Context;

use crate::posts::PostStore;

const CONTRACT: &str = include_str!("contract.yaml");

fn app(contract: &str, config: EngineConfig) -> anyhow::Result<axum::Router> {
    let contract =
        accord_core::document::from_yaml_str(contract).context("invalid contract document")?;
    let store = Arc::new(PostStore::new());
    let dispatcher = Dispatcher::new(&contract, posts::implementation(store), config)
        .context("contract and implementation disagree")?;
    Ok(accord_server::router(Arc::new(dispatcher)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let contract = match std::env::var("ACCORD_CONTRACT") {
        Ok(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read contract {path}"))?,
        Err(_) => CONTRACT.to_string(),
    };

    let config = EngineConfig::from_env();
    tracing::info!(?config, "engine configured");
    let app = app(&contract, config).map_err(|e| {
        tracing::error!("Startup failed: {e:#}");
        e
    })?;

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("accord demo listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> axum::Router {
        app(CONTRACT, EngineConfig::default().response_validation(true)).unwrap()
    }

    async fn send(
        app: &axum::Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, String, Vec<u8>) {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", "Bearer demo");
        let body = match body {
            Some(body) => {
                req = req.header("content-type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get("content-type")
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, bytes.to_vec())
    }

    fn json_of(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_served_under_prefix() {
        let app = test_app();
        let (status, _, body) = send(&app, "GET", "/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body), json!({ "status": "ok" }));

        let (status, _, _) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn post_lifecycle() {
        let app = test_app();

        let (status, _, body) = send(
            &app,
            "POST",
            "/v1/posts",
            Some(json!({ "title": "Hello", "tags": ["intro"] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            json_of(&body),
            json!({ "id": 1, "title": "Hello", "body": "", "tags": ["intro"], "published": false })
        );

        let (status, _, body) = send(
            &app,
            "PATCH",
            "/v1/posts/1",
            Some(json!({ "published": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["published"], true);

        let (status, content_type, body) = send(&app, "GET", "/v1/posts/1/export", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "text/markdown");
        assert_eq!(String::from_utf8(body).unwrap(), "# Hello\n\n\n");

        let (status, _, _) = send(&app, "DELETE", "/v1/posts/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _, body) = send(&app, "GET", "/v1/posts/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn list_coerces_take_and_filters_by_tag() {
        let app = test_app();
        for (title, tag) in [("a", "x"), ("b", "y"), ("c", "x")] {
            let (status, _, _) = send(
                &app,
                "POST",
                "/v1/posts",
                Some(json!({ "title": title, "tags": [tag] })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, _, body) = send(&app, "GET", "/v1/posts?take=1&tag=x", None).await;
        assert_eq!(status, StatusCode::OK);
        let posts = json_of(&body)["posts"].clone();
        assert_eq!(posts.as_array().unwrap().len(), 1);
        assert_eq!(posts[0]["title"], "c");

        let (status, _, body) = send(&app, "GET", "/v1/posts?take=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json_of(&body)["queryParameterErrors"].is_object());
    }

    #[tokio::test]
    async fn writes_require_bearer_token() {
        let app = test_app();
        let req = Request::builder()
            .method("POST")
            .uri("/v1/posts")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "title": "x" }).to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(json_of(&bytes)["headerErrors"].is_object());
    }

    #[test]
    fn mismatched_contract_fails_startup() {
        let contract = "routes:\n  health: { method: GET, path: /health }\n";
        let err = app(contract, EngineConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("disagree"));
    }
}
