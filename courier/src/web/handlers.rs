//! Ingress endpoint handlers.
//!
//! The publish handler does no parsing: the body is forwarded to the
//! broker unchanged and the response only says whether that worked.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{error, info};

use crate::queue::Publish;

pub const PUBLISH_OK_TEXT: &str = "Data received from POST request!";
pub const PUBLISH_FAILED_TEXT: &str = "Error sending message to queue";
pub const LIVENESS_TEXT: &str = "Hello, this is a GET request!";
pub const METHOD_NOT_ALLOWED_TEXT: &str = "Invalid request method";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<dyn Publish>,
}

impl AppState {
    pub fn new(publisher: impl Publish + 'static) -> Self {
        Self {
            publisher: Arc::new(publisher),
        }
    }
}

/// Liveness endpoint.
pub async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

/// Publish endpoint: the whole body becomes the message payload.
pub async fn publish_message(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    info!(body_length = body.len(), "publish_request_received");

    if let Err(e) = state.publisher.publish(&body).await {
        error!(error = %e, "publish_request_failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, PUBLISH_FAILED_TEXT);
    }

    info!(body_length = body.len(), "publish_request_enqueued");

    (StatusCode::OK, PUBLISH_OK_TEXT)
}

/// Fallback for unsupported methods on known paths.
pub async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED_TEXT)
}
