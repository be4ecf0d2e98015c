//! Gryzzly builder - GitHub webhook receiver.
//!
//! This library provides the pieces behind the `gryzzly-builder` binary:
//! - `config`: flag and environment configuration
//! - `web`: signature verification, event dispatch and the axum router
//!
//! ## Request Flow
//!
//! ```text
//! POST → signature check → X-GitHub-Event → decode payload → callback → status
//! ```

pub mod config;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use web::{
    build_router, Callback, EventKind, PushEvent, ReleaseEvent, ReleaseName, Webhook,
    WebhookConfig, WebhookError,
};
