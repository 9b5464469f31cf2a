//! # Contract Builder
//!
//! Resolves [`RouterOptions`] onto a contract tree, depth-first, pre-order.
//! For every route below the router:
//!
//! - `headers`: `merge(base_headers, route.headers)`
//! - `path`: `path_prefix + route.path`
//! - `responses`: `common_responses` overlaid by the route's own entries
//! - `strict_status_codes`: the route's value if set, else the option's
//!
//! Nested routers are resolved with the same options. A sub-router that was
//! itself built with options already carries its resolved paths and headers,
//! so prefixes compose outer-to-inner: `/v1` + `/posts` + `/:id`.
//!
//! The input tree is never modified.

use accord_schema::merge;

use crate::route::Route;
use crate::router::{ContractNode, Router, RouterOptions};

/// Build a resolved contract from `tree` and `options`.
pub fn build_router(tree: &Router, options: &RouterOptions) -> Router {
    let mut resolved = Router::new();
    for (key, node) in tree.children() {
        let node = match node {
            ContractNode::Route(route) => ContractNode::Route(apply_options(route, options)),
            ContractNode::Router(sub) => ContractNode::Router(build_router(sub, options)),
        };
        resolved.insert(key, node);
    }
    resolved
}

fn apply_options(route: &Route, options: &RouterOptions) -> Route {
    let mut resolved = route.clone();

    resolved.headers = merge(options.base_headers.as_ref(), route.headers.as_ref());

    if let Some(prefix) = &options.path_prefix {
        resolved.path = format!("{prefix}{}", route.path);
    }

    let mut responses = options.common_responses.clone();
    responses.extend(route.responses.clone());
    resolved.responses = responses;

    resolved.strict_status_codes = route.strict_status_codes.or(options.strict_status_codes);

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::ResponseEntry;
    use accord_schema::{validate, Schema, ValidateOptions};
    use serde_json::json;

    fn string_field(name: &str) -> Schema {
        Schema::new(json!({
            "type": "object",
            "properties": { name: { "type": "string" } },
            "required": [name]
        }))
        .unwrap()
    }

    fn error_schema() -> Schema {
        Schema::new(json!({
            "type": "object",
            "properties": { "message": { "type": "string" } }
        }))
        .unwrap()
    }

    #[test]
    fn nested_prefixes_compose_outer_to_inner() {
        let posts = Router::new().route("getPost", Route::get("/:id"));
        let posts = build_router(&posts, &RouterOptions::new().path_prefix("/posts"));
        let api = Router::new().router("posts", posts);
        let api = build_router(&api, &RouterOptions::new().path_prefix("/v1"));

        assert_eq!(api.lookup("posts.getPost").unwrap().path, "/v1/posts/:id");
    }

    #[test]
    fn prefix_applies_to_every_descendant() {
        let tree = Router::new()
            .route("root", Route::get("/"))
            .router("deep", Router::new().router("er", Router::new().route("leaf", Route::get("/leaf"))));
        let resolved = build_router(&tree, &RouterOptions::new().path_prefix("/api"));
        assert_eq!(resolved.lookup("root").unwrap().path, "/api/");
        assert_eq!(resolved.lookup("deep.er.leaf").unwrap().path, "/api/leaf");
    }

    #[test]
    fn base_headers_merge_into_route_headers() {
        let tree = Router::new()
            .route("withHeaders", Route::get("/a").headers(string_field("x-trace")))
            .route("withoutHeaders", Route::get("/b"));
        let resolved = build_router(
            &tree,
            &RouterOptions::new().base_headers(string_field("authorization")),
        );

        let merged = resolved.lookup("withHeaders").unwrap().headers.clone().unwrap();
        let mut required = merged.required();
        required.sort();
        assert_eq!(required, vec!["authorization", "x-trace"]);

        let only_base = resolved.lookup("withoutHeaders").unwrap().headers.clone().unwrap();
        assert_eq!(only_base, string_field("authorization"));
    }

    #[test]
    fn outer_base_headers_merge_into_already_merged_inner_headers() {
        let inner = build_router(
            &Router::new().route("r", Route::get("/r").headers(string_field("x-route"))),
            &RouterOptions::new().base_headers(string_field("x-inner")),
        );
        let outer = build_router(
            &Router::new().router("inner", inner),
            &RouterOptions::new().base_headers(string_field("x-outer")),
        );
        let headers = outer.lookup("inner.r").unwrap().headers.clone().unwrap();
        let mut required = headers.required();
        required.sort();
        assert_eq!(required, vec!["x-inner", "x-outer", "x-route"]);

        let ok = validate(
            &json!({ "x-inner": "1", "x-outer": "2", "x-route": "3" }),
            Some(&headers),
            ValidateOptions::PASS_THROUGH,
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn route_responses_win_over_common_responses() {
        let route_404 = Schema::new(json!({ "type": "string" })).unwrap();
        let tree = Router::new().route(
            "r",
            Route::get("/r")
                .response(200, string_field("id"))
                .response(404, route_404.clone()),
        );
        let resolved = build_router(
            &tree,
            &RouterOptions::new()
                .common_response(404, error_schema())
                .common_response(500, error_schema()),
        );
        let route = resolved.lookup("r").unwrap();
        assert_eq!(route.responses.len(), 3);
        assert_eq!(route.response_for(404), Some(&ResponseEntry::Json(route_404)));
        assert_eq!(route.response_for(500), Some(&ResponseEntry::Json(error_schema())));
    }

    #[test]
    fn route_strict_status_codes_overrides_router_default() {
        let tree = Router::new()
            .route("lenient", Route::get("/a").strict_status_codes(false))
            .route("strict", Route::get("/b").strict_status_codes(true))
            .route("inherit", Route::get("/c"));

        let strict = build_router(&tree, &RouterOptions::new().strict_status_codes(true));
        assert_eq!(strict.lookup("lenient").unwrap().strict_status_codes, Some(false));
        assert_eq!(strict.lookup("inherit").unwrap().strict_status_codes, Some(true));

        let lenient = build_router(&tree, &RouterOptions::new().strict_status_codes(false));
        assert_eq!(lenient.lookup("strict").unwrap().strict_status_codes, Some(true));
        assert_eq!(lenient.lookup("inherit").unwrap().strict_status_codes, Some(false));
    }

    #[test]
    fn default_options_leave_routes_unchanged() {
        let tree = Router::new().route("r", Route::get("/r").headers(string_field("a")));
        assert_eq!(build_router(&tree, &RouterOptions::default()), tree);
    }

    #[test]
    fn builder_is_pure() {
        let tree = Router::new()
            .route("a", Route::get("/a").headers(string_field("x")))
            .router("n", Router::new().route("b", Route::post("/b")));
        let snapshot = tree.clone();
        let options = RouterOptions::new()
            .path_prefix("/v2")
            .base_headers(string_field("y"))
            .common_response(500, error_schema());

        let first = build_router(&tree, &options);
        let second = build_router(&tree, &options);
        assert_eq!(first, second);
        assert_eq!(tree, snapshot);
    }

    #[test]
    fn with_options_delegates_to_builder() {
        let tree = Router::new().route("r", Route::get("/r"));
        let options = RouterOptions::new().path_prefix("/x");
        assert_eq!(tree.with_options(&options), build_router(&tree, &options));
    }
}
