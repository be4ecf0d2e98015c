//! Gryzzly Builder - GitHub webhook receiver.
//!
//! Verifies every delivery against the shared webhook secret, then hands
//! `push` and `release` events to their callbacks.

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gryzzly::{build_router, Callback, Config, PushEvent, ReleaseEvent, Webhook, WebhookConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("builder_starting");

    let config = Config::load().context("Invalid configuration")?;
    info!(
        addr = %config.addr,
        path = %config.path,
        max_body_bytes = config.max_body_bytes,
        "config_loaded"
    );

    let webhook = Webhook::new(
        config.webhook_secret.clone(),
        WebhookConfig::default()
            .max_body_bytes(config.max_body_bytes)
            .on_push(Callback::new(|push: PushEvent| async move {
                info!(git_ref = %push.git_ref, "push_received");
                Ok(())
            }))
            .on_release(Callback::new(|release: ReleaseEvent| async move {
                info!(
                    action = %release.action,
                    tag_name = %release.release.tag_name,
                    name = ?release.release.name,
                    "release_received"
                );
                Ok(())
            })),
    );

    let app = build_router(webhook, &config.path);

    let listener = TcpListener::bind(config.addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %config.addr, "builder_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("builder_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("builder_shutting_down");
}
