//! Body capture middleware for audit logging.
//!
//! Audit records carry the request payload and the response body, but axum
//! bodies are single-consumption streams. This layer buffers them once,
//! stores the bytes in the request's [`RequestContext`], and rebuilds an
//! identical message so handlers never notice the detour.
//!
//! Only JSON mutation requests (POST/PUT/PATCH with an `application/json`
//! content type) below the configured cap are captured on the way in;
//! multipart uploads and oversized bodies flow through uncaptured and the
//! audit record falls back to the handler's canonical payload. Responses
//! are always buffered. Capture never rejects a request.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Method, Request, Response, header};
use tower::{Layer, Service};
use tracing::debug;

use crate::context::RequestContext;

/// Layer that buffers request and response bodies for audit capture.
#[derive(Debug, Clone)]
pub struct BodyCacheLayer {
    max_request_bytes: usize,
}

impl BodyCacheLayer {
    /// Create a layer capturing request bodies up to `max_request_bytes`.
    pub fn new(max_request_bytes: usize) -> Self {
        Self { max_request_bytes }
    }
}

impl<S> Layer<S> for BodyCacheLayer {
    type Service = BodyCacheService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BodyCacheService {
            inner,
            max_request_bytes: self.max_request_bytes,
        }
    }
}

/// Service wrapper performing the buffering.
#[derive(Debug, Clone)]
pub struct BodyCacheService<S> {
    inner: S,
    max_request_bytes: usize,
}

impl<S> Service<Request<Body>> for BodyCacheService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let max_request_bytes = self.max_request_bytes;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            // The audit middleware inserts the context before this layer runs.
            let context = req.extensions().get::<RequestContext>().cloned();

            let req = match context {
                Some(ref ctx) if should_capture(&req, max_request_bytes) => {
                    capture_request_body(req, ctx).await
                }
                _ => req,
            };

            let response = inner.call(req).await?;

            match context {
                Some(ctx) => Ok(capture_response_body(response, &ctx).await),
                None => Ok(response),
            }
        })
    }
}

/// Decide whether a request body is worth buffering.
///
/// Captures JSON mutation requests whose declared `Content-Length` fits the
/// cap. Requests without a declared length (chunked transfers) are skipped
/// so the stream is never consumed speculatively.
fn should_capture<B>(req: &Request<B>, max_bytes: usize) -> bool {
    if !matches!(*req.method(), Method::POST | Method::PUT | Method::PATCH) {
        return false;
    }

    let is_json = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"));
    if !is_json {
        return false;
    }

    declared_length(req).is_some_and(|length| length <= max_bytes as u64)
}

/// Declared `Content-Length` of a request, if present and parseable.
fn declared_length<B>(req: &Request<B>) -> Option<u64> {
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

/// Buffer the request body, snapshot it, and rebuild an identical request.
async fn capture_request_body(req: Request<Body>, context: &RequestContext) -> Request<Body> {
    let (parts, body) = req.into_parts();

    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            context.set_request_body(bytes.clone()).await;
            Request::from_parts(parts, Body::from(bytes))
        }
        Err(err) => {
            // The stream cannot be replayed once a read fails; the handler
            // sees an empty body instead of a transport error.
            debug!(error = %err, path = %parts.uri.path(), "Failed to buffer request body");
            Request::from_parts(parts, Body::empty())
        }
    }
}

/// Buffer the response body, snapshot it, and rebuild an identical response.
async fn capture_response_body(
    response: Response<Body>,
    context: &RequestContext,
) -> Response<Body> {
    let (parts, body) = response.into_parts();

    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            context.set_response_body(bytes.clone()).await;
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(err) => {
            debug!(error = %err, "Failed to buffer response body");
            Response::from_parts(parts, Body::empty())
        }
    }
}
