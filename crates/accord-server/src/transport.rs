//! # Axum Transport
//!
//! Mounts a [`Dispatcher`] as the fallback of an `axum::Router`, so every
//! request reaches contract matching:
//!
//! ```text
//! TraceLayer → fallback(serve) → Dispatcher::handle
//! ```

use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::response::Response;
use axum::Router;
use http_body_util::LengthLimitError;
use tower_http::trace::TraceLayer;

use crate::dispatch::Dispatcher;
use crate::error::{BodyError, DispatchError};

/// Maximum request body size: 2 MiB. Larger bodies are answered with 413.
pub const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Assemble an Axum router serving every contract route of `dispatcher`.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .fallback(serve)
        .with_state(dispatcher)
        .layer(TraceLayer::new_for_http())
}

async fn serve(State(dispatcher): State<Arc<Dispatcher>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    match to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => dispatcher.handle(parts, bytes).await,
        Err(e) => {
            let error = if exceeds_limit(&e) {
                BodyError::TooLarge { limit: BODY_LIMIT }
            } else {
                BodyError::Read(e.to_string())
            };
            dispatcher.render_error(DispatchError::MalformedBody(error), &parts)
        }
    }
}

fn exceeds_limit(error: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}
