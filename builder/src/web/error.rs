//! Errors raised while handling a webhook delivery.

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors that end a webhook delivery.
///
/// The response body never carries the error text, only a generic message
/// for the status code. Details go to the log.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("method not allowed: {0}")]
    MethodNotAllowed(Method),

    #[error("signature is missing")]
    MissingSignature,

    /// Signature header without the `sha1=` prefix.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("failed to read body: {0}")]
    UnreadableBody(#[source] axum::Error),

    #[error("unexpected event: {0:?}")]
    UnknownEvent(String),

    #[error("failed to decode {event} payload: {source}")]
    Decode {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{event} callback failed: {error:#}")]
    Callback {
        event: &'static str,
        error: anyhow::Error,
    },
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            WebhookError::Callback { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            WebhookError::MissingSignature
            | WebhookError::MalformedSignature(_)
            | WebhookError::InvalidSignature(_)
            | WebhookError::UnreadableBody(_)
            | WebhookError::UnknownEvent(_)
            | WebhookError::Decode { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let message = match self.status() {
            StatusCode::METHOD_NOT_ALLOWED => "method not allowed",
            StatusCode::INTERNAL_SERVER_ERROR => "internal server error",
            _ => "bad request",
        };

        (self.status(), message).into_response()
    }
}
