//! Web server module for the ingress endpoint.
//!
//! This module provides a thin web server that:
//! - Publishes every `POST /post` body to the broker as-is
//! - Answers `GET /` as a liveness check without touching the broker
//! - Rejects any other method on those paths with 405

pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    liveness, method_not_allowed, publish_message, AppState, LIVENESS_TEXT,
    METHOD_NOT_ALLOWED_TEXT, PUBLISH_FAILED_TEXT, PUBLISH_OK_TEXT,
};

/// Build the ingress router.
///
/// Request bodies are not size-limited.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness).fallback(method_not_allowed))
        .route("/post", post(publish_message).fallback(method_not_allowed))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
