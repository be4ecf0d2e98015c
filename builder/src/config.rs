//! Configuration module for command line and environment variable parsing.
//!
//! Every flag can also be set through its `BUILDER_*` environment variable.

use std::net::SocketAddr;

use clap::Parser;
use thiserror::Error;

use crate::web::webhook::DEFAULT_MAX_BODY_BYTES;

/// Application configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "gryzzly-builder", about = "GitHub webhook receiver", version)]
pub struct Config {
    /// Server address
    #[arg(long, env = "BUILDER_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: SocketAddr,

    /// Mandatory webhook secret shared with GitHub
    #[arg(long = "webhook", env = "BUILDER_WEBHOOK", hide_env_values = true)]
    pub webhook_secret: String,

    /// Path the webhook is mounted at
    #[arg(long, env = "BUILDER_PATH", default_value = "/")]
    pub path: String,

    /// Maximum accepted request body size in bytes
    #[arg(long, env = "BUILDER_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
}

/// Configuration rejected at startup.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("webhook secret must not be empty")]
    EmptySecret,

    #[error("webhook path must start with '/': {0:?}")]
    InvalidPath(String),
}

impl Config {
    /// Parse flags and environment, exiting with usage on bad input.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook_secret.trim().is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if !self.path.starts_with('/') {
            return Err(ConfigError::InvalidPath(self.path.clone()));
        }
        Ok(())
    }
}
