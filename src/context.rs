//! Per-request correlation state shared across the pipeline.
//!
//! The audit middleware inserts a [`RequestContext`] into the request
//! extensions at the start of every audited exchange. Guards, the body cache,
//! and handlers all hold clones of the same handle, so whatever one stage
//! records (caller identity, body snapshots, a canonical payload, a vendor
//! correlation id) is visible to the audit completion phase.
//!
//! The context lives exactly as long as its request. Nothing here is
//! thread-local or global.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::Mutex;

/// Identity established by the caller guard after full verification.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub api_key: String,
    pub account_id: String,
    pub portfolio: String,
}

#[derive(Debug, Default)]
struct ContextInner {
    identity: Option<CallerIdentity>,
    request_body: Option<Bytes>,
    response_body: Option<Bytes>,
    canonical_payload: Option<String>,
    correlation_id: Option<String>,
}

/// Cloneable handle to the state of one request.
///
/// Clones share the same underlying state; the handle is cheap to copy into
/// middleware futures.
#[derive(Debug, Clone)]
pub struct RequestContext {
    started_at: Instant,
    inner: Arc<Mutex<ContextInner>>,
}

impl RequestContext {
    /// Create a fresh context, capturing the start instant.
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            inner: Arc::new(Mutex::new(ContextInner::default())),
        }
    }

    /// Wall time elapsed since the context was created.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Record the authenticated caller.
    pub async fn set_identity(&self, identity: CallerIdentity) {
        self.inner.lock().await.identity = Some(identity);
    }

    /// The authenticated caller, if the caller guard ran and passed.
    pub async fn identity(&self) -> Option<CallerIdentity> {
        self.inner.lock().await.identity.clone()
    }

    /// Store the request body snapshot.
    pub async fn set_request_body(&self, body: Bytes) {
        self.inner.lock().await.request_body = Some(body);
    }

    /// The cached request body, if the request was eligible for caching.
    pub async fn request_body(&self) -> Option<Bytes> {
        self.inner.lock().await.request_body.clone()
    }

    /// Store the response body snapshot.
    pub async fn set_response_body(&self, body: Bytes) {
        self.inner.lock().await.response_body = Some(body);
    }

    /// The buffered response body.
    pub async fn response_body(&self) -> Option<Bytes> {
        self.inner.lock().await.response_body.clone()
    }

    /// Override the audited request payload with a handler-built rendition.
    ///
    /// Used by multipart endpoints whose raw body is not worth storing.
    pub async fn set_canonical_payload(&self, payload: String) {
        self.inner.lock().await.canonical_payload = Some(payload);
    }

    /// The canonical payload override, when a handler set one.
    pub async fn canonical_payload(&self) -> Option<String> {
        self.inner.lock().await.canonical_payload.clone()
    }

    /// Attach a vendor correlation id (KID) to this exchange.
    pub async fn set_correlation_id(&self, id: String) {
        self.inner.lock().await.correlation_id = Some(id);
    }

    /// The vendor correlation id, when one was produced.
    pub async fn correlation_id(&self) -> Option<String> {
        self.inner.lock().await.correlation_id.clone()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
