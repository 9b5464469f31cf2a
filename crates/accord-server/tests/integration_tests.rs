//! # Integration Tests for accord-server
//!
//! Drives the Axum transport end to end: route matching, request validation
//! (400 aggregate and throw mode), response stripping, JSON query mode,
//! handler respond signals, custom error handlers, and body decoding.

use std::sync::Arc;

use accord_core::{ResponseEntry, Route, Router, RouterOptions, Schema};
use accord_server::{
    DispatchError, Dispatcher, EngineConfig, HandlerError, Implementation, ServerRequest,
    ServerResponse,
};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn schema(document: Value) -> Schema {
    Schema::new(document).unwrap()
}

/// Helper: the posts contract used across tests.
fn contract() -> Router {
    let posts = Router::new()
        .route(
            "getPost",
            Route::get("/:id")
                .path_params(schema(json!({
                    "type": "object",
                    "properties": { "id": { "type": "integer", "x-coerce": true } }
                })))
                .response(
                    200,
                    schema(json!({
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "title": { "type": "string" }
                        }
                    })),
                )
                .response(404, ResponseEntry::NoBody),
        )
        .route(
            "createPost",
            Route::post("/").body(schema(json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "published": { "type": "boolean", "default": false }
                },
                "required": ["title"]
            }))),
        )
        .route(
            "searchPosts",
            Route::get("/search").query(schema(json!({
                "type": "object",
                "properties": {
                    "take": { "type": "integer" },
                    "tags": { "type": "array", "items": { "type": "string" } }
                }
            }))),
        );
    let posts = posts.with_options(&RouterOptions::new().path_prefix("/posts"));

    Router::new()
        .route("test", Route::get("/test/:id"))
        .router("posts", posts)
        .with_options(
            &RouterOptions::new()
                .path_prefix("/v1")
                .base_headers(schema(json!({
                    "type": "object",
                    "properties": { "x-api-key": { "type": "string" } }
                }))),
        )
}

async fn get_post(req: ServerRequest) -> Result<ServerResponse, HandlerError> {
    match req.param("id").and_then(Value::as_i64) {
        Some(1) => Ok(ServerResponse::ok(json!({
            "id": 1,
            "title": "Hello",
            "internalNotes": "should be stripped"
        }))),
        _ => Err(HandlerError::respond(404, Value::Null)),
    }
}

async fn echo(req: ServerRequest) -> Result<ServerResponse, HandlerError> {
    Ok(ServerResponse::new(
        if req.route.method.is_query() { 200 } else { 201 },
        json!({
            "params": req.params,
            "query": req.query,
            "body": req.body,
            "apiKey": req.header("x-api-key"),
        }),
    ))
}

fn implementation() -> Implementation {
    Implementation::new().handler("test", echo).router(
        "posts",
        Implementation::new()
            .handler("getPost", get_post)
            .handler("createPost", echo)
            .handler("searchPosts", echo),
    )
}

/// Helper: build the test app.
fn test_app(config: EngineConfig) -> axum::Router {
    let dispatcher = Dispatcher::new(&contract(), implementation(), config).unwrap();
    accord_server::router(Arc::new(dispatcher))
}

/// Helper: read response body as JSON (`Null` when empty).
async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// -- Route matching -----------------------------------------------------------

#[tokio::test]
async fn test_param_route_matches_and_binds() {
    let response = test_app(EngineConfig::default())
        .oneshot(get("/v1/test/3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["params"], json!({ "id": "3" }));
}

#[tokio::test]
async fn test_unmatched_path_is_404_without_body() {
    let response = test_app(EngineConfig::default())
        .oneshot(get("/v1/test"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, Value::Null);
}

#[tokio::test]
async fn test_wrong_method_is_404() {
    let request = Request::builder()
        .method("DELETE")
        .uri("/v1/test/3")
        .body(Body::empty())
        .unwrap();
    let response = test_app(EngineConfig::default()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_literal_route_wins_over_param_route() {
    let response = test_app(EngineConfig::default())
        .oneshot(get("/v1/posts/search"))
        .await
        .unwrap();
    // /v1/posts/:id would reject "search" as an integer.
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Request validation -------------------------------------------------------

#[tokio::test]
async fn test_missing_required_body_field_is_400() {
    let response = test_app(EngineConfig::default())
        .oneshot(post_json("/v1/posts", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["pathParameterErrors"], Value::Null);
    assert_eq!(body["headerErrors"], Value::Null);
    assert_eq!(body["queryParameterErrors"], Value::Null);
    let issues = body["bodyErrors"]["issues"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["path"], json!(["title"]));
}

#[tokio::test]
async fn test_valid_body_gets_defaults_and_loses_unknown_keys() {
    let response = test_app(EngineConfig::default())
        .oneshot(post_json("/v1/posts", r#"{"title":"Hi","extra":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["body"], json!({ "title": "Hi", "published": false }));
}

#[tokio::test]
async fn test_invalid_path_param_is_400() {
    let response = test_app(EngineConfig::default())
        .oneshot(get("/v1/posts/abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["pathParameterErrors"]["issues"][0]["path"], json!(["id"]));
}

#[tokio::test]
async fn test_headers_pass_through_and_validate() {
    let request = Request::builder()
        .uri("/v1/test/9")
        .header("X-Api-Key", "secret")
        .header("X-Other", "kept")
        .body(Body::empty())
        .unwrap();
    let response = test_app(EngineConfig::default()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["apiKey"], json!("secret"));
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let response = test_app(EngineConfig::default())
        .oneshot(post_json("/v1/posts", "{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "MALFORMED_BODY");
}

#[tokio::test]
async fn test_oversized_body_is_413() {
    let title = "x".repeat(accord_server::transport::BODY_LIMIT);
    let response = test_app(EngineConfig::default())
        .oneshot(post_json("/v1/posts", &json!({ "title": title }).to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_garbage_body_does_not_shadow_routing() {
    let garbage = |uri: &str| {
        Request::builder()
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap()
    };

    let response = test_app(EngineConfig::default())
        .oneshot(garbage("/v1/nowhere"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, Value::Null);

    let response = test_app(EngineConfig::default())
        .oneshot(garbage("/v1/test/3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["body"], json!({}));
}

// -- Query modes --------------------------------------------------------------

#[tokio::test]
async fn test_plain_query_values_stay_strings() {
    let response = test_app(EngineConfig::default())
        .oneshot(get("/v1/posts/search?take=5"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["queryParameterErrors"]["issues"][0]["path"], json!(["take"]));
}

#[tokio::test]
async fn test_json_query_mode() {
    let app = test_app(EngineConfig::default().json_query(true));
    let uri = "/v1/posts/search?take=5&tags=%5B%22a%22%2C%22b%22%5D";
    let response = app.oneshot(get(uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["query"], json!({ "take": 5, "tags": ["a", "b"] }));
}

// -- Responses ----------------------------------------------------------------

#[tokio::test]
async fn test_response_validation_strips_undeclared_keys() {
    let response = test_app(EngineConfig::default().response_validation(true))
        .oneshot(get("/v1/posts/1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "id": 1, "title": "Hello" }));
}

#[tokio::test]
async fn test_responses_unvalidated_by_default() {
    let response = test_app(EngineConfig::default())
        .oneshot(get("/v1/posts/1"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["internalNotes"], "should be stripped");
}

#[tokio::test]
async fn test_respond_signal_with_no_body_entry() {
    let response = test_app(EngineConfig::default())
        .oneshot(get("/v1/posts/2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, Value::Null);
}

// -- Error handling -----------------------------------------------------------

#[tokio::test]
async fn test_throw_mode_without_handler_renders_aggregate() {
    let response = test_app(EngineConfig::default().throw_request_validation(true))
        .oneshot(post_json("/v1/posts", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["bodyErrors"]["issues"].is_array());
}

#[tokio::test]
async fn test_throw_mode_hands_errors_to_error_handler() {
    let dispatcher = Dispatcher::new(
        &contract(),
        implementation(),
        EngineConfig::default().throw_request_validation(true),
    )
    .unwrap()
    .with_error_handler(|error, parts| match error {
        DispatchError::RequestValidation(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({
                "path": parts.uri.path(),
                "bodyIssues": errors.body_errors.as_ref().map(|e| e.issues.len()),
            })),
        )
            .into_response(),
        other => other.status_and_code().0.into_response(),
    });
    let app = accord_server::router(Arc::new(dispatcher));

    let response = app.oneshot(post_json("/v1/posts", "{}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body, json!({ "path": "/v1/posts", "bodyIssues": 1 }));
}

#[tokio::test]
async fn test_unexpected_handler_error_is_opaque_500() {
    let contract = Router::new().route("boom", Route::get("/boom"));
    let implementation = Implementation::new().handler("boom", |_req: ServerRequest| async {
        Err::<ServerResponse, _>(HandlerError::unexpected("connection refused by db-7"))
    });
    let dispatcher = Dispatcher::new(&contract, implementation, EngineConfig::default()).unwrap();
    let response = accord_server::router(Arc::new(dispatcher))
        .oneshot(get("/boom"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    assert!(!body.to_string().contains("db-7"));
}

#[tokio::test]
async fn test_invalid_response_is_500_with_issues() {
    let contract = Router::new().route(
        "bad",
        Route::get("/bad").response(
            200,
            schema(json!({ "type": "object", "required": ["id"] })),
        ),
    );
    let implementation = Implementation::new().handler("bad", |_req: ServerRequest| async {
        Ok::<_, HandlerError>(ServerResponse::ok(json!({ "password": "hunter2" })))
    });
    let dispatcher = Dispatcher::new(
        &contract,
        implementation,
        EngineConfig::default().response_validation(true),
    )
    .unwrap();
    let response = accord_server::router(Arc::new(dispatcher))
        .oneshot(get("/bad"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "RESPONSE_VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["issues"][0]["path"], json!(["id"]));
    assert!(!body.to_string().contains("hunter2"));
}
