//! Audit capture for business routes.
//!
//! Outermost layer of the business pipeline. On the way in it creates the
//! per-request [`RequestContext`] and snapshots attribution material
//! (method, path, client IP, user agent); on the way out it assembles an
//! [`AuditEntry`] from the context and the finished response and hands it
//! to the [`AuditWriter`]. The response is never delayed by persistence.
//!
//! The guards run inside this layer, so rejected requests produce audit
//! entries exactly like successful ones, attributed to the anonymous
//! caller when no identity was established. Operational probes (`/health`,
//! `/ready`) are not audited.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use chrono::Utc;
use tower::{Layer, Service};
use tracing::debug;
use uuid::Uuid;

use super::ip::extract_client_ip;
use super::request_id::RequestIdExt;
use crate::context::RequestContext;
use crate::metrics::record_request_duration;
use crate::models::{AuditEntry, truncate_error_message, truncate_payload};
use crate::paths;
use crate::services::AuditWriter;

/// Attribution recorded when no caller identity was established.
pub const PUBLIC_CALLER: &str = "public";

/// Audit capture layer.
#[derive(Clone)]
pub struct AuditLayer {
    writer: AuditWriter,
}

impl AuditLayer {
    /// Create a layer feeding entries to `writer`.
    pub fn new(writer: AuditWriter) -> Self {
        Self { writer }
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditService {
            inner,
            writer: self.writer.clone(),
        }
    }
}

/// Audit capture service wrapper.
#[derive(Clone)]
pub struct AuditService<S> {
    inner: S,
    writer: AuditWriter,
}

impl<S> Service<Request<Body>> for AuditService<S>
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

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let writer = self.writer.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = req.uri().path().to_string();
            if !paths::is_audited(&path) {
                return inner.call(req).await;
            }

            let method = req.method().to_string();
            let client_ip = extract_client_ip(&req).into_owned();
            let user_agent = req
                .headers()
                .get(header::USER_AGENT)
                .and_then(|value| value.to_str().ok())
                .map(ToString::to_string);
            let request_id = req.request_id();

            let context = RequestContext::new();
            req.extensions_mut().insert(context.clone());

            debug!(
                request_id = request_id.as_deref().unwrap_or("-"),
                method = %method,
                path = %path,
                "Audit capture started"
            );

            let response = inner.call(req).await?;

            let entry = build_entry(
                &context,
                method.clone(),
                path.clone(),
                client_ip,
                user_agent,
                response.status(),
            )
            .await;

            debug!(
                request_id = request_id.as_deref().unwrap_or("-"),
                http_status = entry.http_status,
                duration_ms = entry.request_duration_ms,
                "Audit capture finished"
            );

            record_request_duration(
                endpoint_label(&path),
                &method,
                response.status().as_str(),
                context.elapsed().as_secs_f64(),
            );
            writer.enqueue(entry);

            Ok(response)
        })
    }
}

/// Assemble the completion record from the request context and response.
async fn build_entry(
    context: &RequestContext,
    http_method: String,
    endpoint: String,
    client_ip: String,
    user_agent: Option<String>,
    status: StatusCode,
) -> AuditEntry {
    let identity = context.identity().await;
    let (account_id, portfolio) = match &identity {
        Some(identity) => (
            Some(identity.account_id.clone()),
            Some(identity.portfolio.clone()),
        ),
        None => (None, None),
    };
    let created_by = identity
        .map(|identity| identity.account_id)
        .unwrap_or_else(|| PUBLIC_CALLER.to_string());

    // Handler-provided canonical payloads win over the raw buffered body.
    let payload = match context.canonical_payload().await.filter(|p| !p.is_empty()) {
        Some(canonical) => Some(truncate_payload(&canonical)),
        None => context
            .request_body()
            .await
            .filter(|bytes| !bytes.is_empty())
            .map(|bytes| truncate_payload(&String::from_utf8_lossy(&bytes))),
    };

    let response_payload = context
        .response_body()
        .await
        .filter(|bytes| !bytes.is_empty())
        .map(|bytes| truncate_payload(&String::from_utf8_lossy(&bytes)));

    let is_error = status.as_u16() >= 400;
    let error_message = if is_error {
        response_payload.as_deref().map(truncate_error_message)
    } else {
        None
    };

    let now = Utc::now();
    AuditEntry {
        id: Uuid::new_v4(),
        fm_transaction_id: context.correlation_id().await,
        endpoint,
        http_method,
        payload,
        response: response_payload,
        http_status: status.as_u16(),
        account_id,
        portfolio,
        client_ip,
        user_agent,
        request_duration_ms: context.elapsed().as_millis() as u64,
        is_error,
        error_message,
        created_by: created_by.clone(),
        updated_by: created_by,
        created_at: now,
        updated_at: now,
    }
}

/// Histogram label for a path.
///
/// The account id segment of update paths is collapsed so label
/// cardinality stays bounded.
fn endpoint_label(path: &str) -> &str {
    if path.starts_with(paths::UPDATE_ACCOUNT_PREFIX) {
        paths::UPDATE_ACCOUNT_PREFIX
    } else {
        path
    }
}
