//! HTTP endpoint handlers.
//!
//! The webhook handler is a thin adapter: all verification and dispatch
//! happens in [`Webhook::handle`], this only turns the outcome into a
//! response.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::web::events::EventKind;
use crate::web::webhook::Webhook;

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// GitHub Webhook
// =============================================================================

/// GitHub webhook endpoint.
///
/// Mounted for every method; non-`POST` requests get 405 from the webhook
/// itself.
///
/// - 200 OK: event handled (`pong` for `ping`)
/// - 400 Bad Request: missing/invalid signature, unreadable body, bad JSON, unknown event
/// - 405 Method Not Allowed: anything but `POST`
/// - 500 Internal Server Error: the event callback failed
pub async fn github_webhook(State(webhook): State<Webhook>, request: Request) -> Response {
    match webhook.handle(request).await {
        Ok(EventKind::Ping) => (StatusCode::OK, "pong").into_response(),
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}
