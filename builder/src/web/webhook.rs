//! Webhook authentication and event dispatch.
//!
//! A [`Webhook`] owns the shared secret and one callback per supported event.
//! Each delivery goes through the same steps, in order:
//!
//! 1. Reject anything but `POST`
//! 2. Require the `X-Hub-Signature` header
//! 3. Read the raw body and verify its signature
//! 4. Resolve the `X-GitHub-Event` label
//! 5. Decode the payload and run the bound callback
//!
//! The body is never decoded before its signature has been checked.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::body::{self, Bytes};
use axum::extract::Request;
use axum::http::{HeaderMap, Method};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::web::error::WebhookError;
use crate::web::events::{EventKind, PushEvent, ReleaseEvent};
use crate::web::signature::{parse_signature_header, verify_signature};

/// Header carrying the HMAC-SHA1 signature of the body.
pub const HEADER_SIGNATURE: &str = "x-hub-signature";
/// Header carrying the event label.
pub const HEADER_EVENT: &str = "x-github-event";

/// GitHub caps webhook payloads at 25 MB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

// =============================================================================
// Secret
// =============================================================================

/// Shared webhook secret, used only as the HMAC key.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

// =============================================================================
// Callbacks
// =============================================================================

/// Async business logic bound to one event type.
///
/// Callbacks receive the decoded payload and report failure through
/// `anyhow`. A failed callback turns into a 500 response; its error is only
/// logged.
pub struct Callback<E> {
    inner: Arc<dyn Fn(E) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>,
}

impl<E: Send + 'static> Callback<E> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |event| f(event).boxed()),
        }
    }

    /// Callback that accepts every event and does nothing.
    pub fn noop() -> Self {
        Self::new(|_| async { Ok(()) })
    }

    pub async fn call(&self, event: E) -> anyhow::Result<()> {
        (self.inner)(event).await
    }
}

impl<E> Clone for Callback<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> fmt::Debug for Callback<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}

/// Optional settings for a [`Webhook`].
///
/// Unset callbacks fall back to [`Callback::noop`].
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub push_callback: Option<Callback<PushEvent>>,
    pub release_callback: Option<Callback<ReleaseEvent>>,
    /// Bodies larger than this are rejected as unreadable.
    pub max_body_bytes: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            push_callback: None,
            release_callback: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl WebhookConfig {
    pub fn on_push(mut self, callback: Callback<PushEvent>) -> Self {
        self.push_callback = Some(callback);
        self
    }

    pub fn on_release(mut self, callback: Callback<ReleaseEvent>) -> Self {
        self.release_callback = Some(callback);
        self
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

// =============================================================================
// Webhook
// =============================================================================

/// GitHub webhook endpoint.
///
/// Cheap to clone; every clone shares the same secret and callbacks. Nothing
/// is mutated after construction, so a single instance serves concurrent
/// deliveries.
#[derive(Clone, Debug)]
pub struct Webhook {
    inner: Arc<WebhookInner>,
}

#[derive(Debug)]
struct WebhookInner {
    secret: Secret,
    push_callback: Callback<PushEvent>,
    release_callback: Callback<ReleaseEvent>,
    max_body_bytes: usize,
}

impl Webhook {
    /// Create a webhook verifying deliveries against `secret`.
    pub fn new(secret: impl Into<String>, config: WebhookConfig) -> Self {
        Self {
            inner: Arc::new(WebhookInner {
                secret: Secret::new(secret),
                push_callback: config.push_callback.unwrap_or_else(Callback::noop),
                release_callback: config.release_callback.unwrap_or_else(Callback::noop),
                max_body_bytes: config.max_body_bytes,
            }),
        }
    }

    /// Check a raw body against a signature header value using this webhook's secret.
    pub fn is_valid_signature(&self, body: &[u8], signature: &str) -> bool {
        verify_signature(self.inner.secret.as_bytes(), body, signature)
    }

    /// Authenticate and dispatch one delivery.
    ///
    /// Returns the event that was handled. Every failure is logged here
    /// before it is returned.
    pub async fn handle(&self, request: Request) -> Result<EventKind, WebhookError> {
        let (parts, body) = request.into_parts();

        if parts.method != Method::POST {
            debug!(method = %parts.method, "webhook_method_not_allowed");
            return Err(WebhookError::MethodNotAllowed(parts.method));
        }

        let signature = match header_str(&parts.headers, HEADER_SIGNATURE) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => {
                warn!("webhook_signature_missing");
                return Err(WebhookError::MissingSignature);
            }
        };

        let body = match body::to_bytes(body, self.inner.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "webhook_body_unreadable");
                return Err(WebhookError::UnreadableBody(e));
            }
        };

        if parse_signature_header(&signature).is_none() {
            warn!(signature = %signature, "webhook_signature_malformed");
            return Err(WebhookError::MalformedSignature(signature));
        }

        if !self.is_valid_signature(&body, &signature) {
            warn!(signature = %signature, "webhook_signature_invalid");
            return Err(WebhookError::InvalidSignature(signature));
        }

        let event = EventKind::from_header(header_str(&parts.headers, HEADER_EVENT).unwrap_or(""));
        self.dispatch(&event, &body).await?;

        info!(event = event.as_str(), body_length = body.len(), "webhook_handled");
        Ok(event)
    }

    /// Route a verified body to the callback bound to `event`.
    pub async fn dispatch(&self, event: &EventKind, body: &Bytes) -> Result<(), WebhookError> {
        match event {
            EventKind::Ping => Ok(()),
            EventKind::Push => {
                let push: PushEvent = decode("push", body)?;
                debug!(git_ref = %push.git_ref, "webhook_push_decoded");
                run("push", &self.inner.push_callback, push).await
            }
            EventKind::Release => {
                let release: ReleaseEvent = decode("release", body)?;
                debug!(
                    action = %release.action,
                    tag_name = %release.release.tag_name,
                    "webhook_release_decoded"
                );
                run("release", &self.inner.release_callback, release).await
            }
            // Rejected loudly so a wrong subscription shows up in GitHub's delivery log.
            EventKind::Unknown(label) => {
                warn!(event = %label, "webhook_event_unknown");
                Err(WebhookError::UnknownEvent(label.clone()))
            }
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn decode<T: DeserializeOwned>(event: &'static str, body: &[u8]) -> Result<T, WebhookError> {
    serde_json::from_slice(body).map_err(|source| {
        warn!(event, error = %source, "webhook_payload_invalid");
        WebhookError::Decode { event, source }
    })
}

async fn run<E: Send + 'static>(
    event: &'static str,
    callback: &Callback<E>,
    payload: E,
) -> Result<(), WebhookError> {
    callback.call(payload).await.map_err(|e| {
        error!(event, error = %format!("{:#}", e), "webhook_callback_failed");
        WebhookError::Callback { event, error: e }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::signature::{compute_signature, format_signature_header};
    use axum::body::Body;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const SECRET: &str = "s3cr3t";

    fn signed_request(event: Option<&str>, body: &str) -> Request {
        let signature = format_signature_header(&compute_signature(SECRET.as_bytes(), body.as_bytes()));
        let mut builder = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(HEADER_SIGNATURE, signature);
        if let Some(event) = event {
            builder = builder.header(HEADER_EVENT, event);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn counting_push(counter: Arc<AtomicUsize>) -> Callback<PushEvent> {
        Callback::new(move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_push_invokes_callback_with_ref() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let hook = Webhook::new(
            SECRET,
            WebhookConfig::default().on_push(Callback::new(move |push: PushEvent| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().unwrap().push(push.git_ref);
                    Ok(())
                }
            })),
        );

        let event = hook
            .handle(signed_request(Some("push"), r#"{"ref":"refs/heads/main"}"#))
            .await
            .unwrap();

        assert_eq!(event, EventKind::Push);
        assert_eq!(*seen.lock().unwrap(), vec!["refs/heads/main".to_string()]);
    }

    #[tokio::test]
    async fn test_release_invokes_callback() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let hook = Webhook::new(
            SECRET,
            WebhookConfig::default().on_release(Callback::new(move |release: ReleaseEvent| {
                let sink = Arc::clone(&sink);
                async move {
                    *sink.lock().unwrap() = Some(release);
                    Ok(())
                }
            })),
        );

        let body = r#"{"action":"published","release":{"tag_name":"v1.0.0","name":"One"}}"#;
        hook.handle(signed_request(Some("release"), body)).await.unwrap();

        let release = seen.lock().unwrap().take().unwrap();
        assert_eq!(release.action, "published");
        assert_eq!(release.release.tag_name, "v1.0.0");
        assert_eq!(release.release.name.as_text(), Some("One"));
    }

    #[tokio::test]
    async fn test_default_callbacks_succeed() {
        let hook = Webhook::new(SECRET, WebhookConfig::default());

        let push = hook
            .handle(signed_request(Some("push"), r#"{"ref":"refs/tags/v1"}"#))
            .await;
        assert!(push.is_ok());

        let body = r#"{"action":"created","release":{"tag_name":"v1"}}"#;
        assert!(hook.handle(signed_request(Some("release"), body)).await.is_ok());
    }

    #[tokio::test]
    async fn test_ping_skips_decoding_and_callbacks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let hook = Webhook::new(
            SECRET,
            WebhookConfig::default().on_push(counting_push(Arc::clone(&counter))),
        );

        // Not JSON at all: ping must not try to decode it.
        let event = hook.handle(signed_request(Some("ping"), "zen")).await.unwrap();

        assert_eq!(event, EventKind::Ping);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_json_does_not_invoke_callback() {
        let counter = Arc::new(AtomicUsize::new(0));
        let hook = Webhook::new(
            SECRET,
            WebhookConfig::default().on_push(counting_push(Arc::clone(&counter))),
        );

        let err = hook
            .handle(signed_request(Some("push"), r#"{"ref":"#))
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::Decode { event: "push", .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_callback_failure_is_reported() {
        let hook = Webhook::new(
            SECRET,
            WebhookConfig::default()
                .on_push(Callback::new(|_| async { anyhow::bail!("disk full") })),
        );

        let err = hook
            .handle(signed_request(Some("push"), r#"{"ref":"refs/heads/main"}"#))
            .await
            .unwrap_err();

        match err {
            WebhookError::Callback { event, error } => {
                assert_eq!(event, "push");
                assert_eq!(error.to_string(), "disk full");
            }
            other => panic!("Expected callback error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_and_missing_event() {
        let hook = Webhook::new(SECRET, WebhookConfig::default());

        let err = hook
            .handle(signed_request(Some("deployment"), "{}"))
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::UnknownEvent(ref e) if e == "deployment"));

        let err = hook.handle(signed_request(None, "{}")).await.unwrap_err();
        assert!(matches!(err, WebhookError::UnknownEvent(ref e) if e.is_empty()));
    }

    #[tokio::test]
    async fn test_signature_failures() {
        let hook = Webhook::new(SECRET, WebhookConfig::default());

        let missing = axum::http::Request::builder()
            .method(Method::POST)
            .header(HEADER_EVENT, "push")
            .body(Body::from("{}"))
            .unwrap();
        assert!(matches!(
            hook.handle(missing).await,
            Err(WebhookError::MissingSignature)
        ));

        let short = axum::http::Request::builder()
            .method(Method::POST)
            .header(HEADER_EVENT, "push")
            .header(HEADER_SIGNATURE, "sha")
            .body(Body::from("{}"))
            .unwrap();
        assert!(matches!(
            hook.handle(short).await,
            Err(WebhookError::MalformedSignature(_))
        ));

        let other = Webhook::new("not-the-secret", WebhookConfig::default());
        assert!(matches!(
            other.handle(signed_request(Some("ping"), "{}")).await,
            Err(WebhookError::InvalidSignature(_))
        ));
    }

    #[tokio::test]
    async fn test_method_checked_first() {
        let hook = Webhook::new(SECRET, WebhookConfig::default());
        let request = axum::http::Request::builder()
            .method(Method::GET)
            .body(Body::empty())
            .unwrap();

        assert!(matches!(
            hook.handle(request).await,
            Err(WebhookError::MethodNotAllowed(ref m)) if m == Method::GET
        ));
    }

    #[tokio::test]
    async fn test_oversized_body_is_unreadable() {
        let hook = Webhook::new(SECRET, WebhookConfig::default().max_body_bytes(8));
        let err = hook
            .handle(signed_request(Some("push"), r#"{"ref":"refs/heads/main"}"#))
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::UnreadableBody(_)));
    }

    #[test]
    fn test_secret_is_redacted() {
        let hook = Webhook::new(SECRET, WebhookConfig::default());
        let debug = format!("{:?}", hook);
        assert!(!debug.contains(SECRET));
        assert!(debug.contains("Secret(***)"));
    }
}
