//! Web server module for receiving GitHub webhooks.
//!
//! This module provides:
//! - Signature verification of the raw request body (HMAC-SHA1)
//! - Event routing by the `X-GitHub-Event` header
//! - Typed payloads for `push` and `release`
//! - The axum router exposing the webhook and a health check

pub mod error;
pub mod events;
pub mod handlers;
pub mod signature;
pub mod webhook;

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;

pub use error::WebhookError;
pub use events::{EventKind, PushEvent, Release, ReleaseEvent, ReleaseName};
pub use handlers::{github_webhook, health, HealthResponse};
pub use signature::{compute_signature, format_signature_header, verify_signature};
pub use webhook::{Callback, Secret, Webhook, WebhookConfig, HEADER_EVENT, HEADER_SIGNATURE};

/// Build the router: the webhook at `path`, plus `GET /health`.
pub fn build_router(webhook: Webhook, path: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(path, any(github_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(webhook)
}
