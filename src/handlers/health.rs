//! Health and readiness endpoints.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check with audit writer status
//! - `GET /ready` - Kubernetes-compatible readiness probe
//!
//! # Health vs Readiness
//!
//! - **Health** (`/health`): Returns 200 even if degraded, includes details
//! - **Readiness** (`/ready`): Returns 503 if not ready to serve traffic
//!
//! Both stay outside the audit trail; probes would otherwise dominate it.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::instrument;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint.
///
/// Returns service health including the audit writer state. Always returns
/// 200 OK with status details in the body; `status` flips to `"degraded"`
/// once the writer stops accepting entries.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "audit_writer_running": true,
///   "version": "0.1.0",
///   "timestamp": "2024-01-15T10:30:00Z"
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let audit_writer_running = state.audit_writer.is_running();

    Json(HealthResponse {
        status: if audit_writer_running {
            "healthy"
        } else {
            "degraded"
        }
        .to_string(),
        audit_writer_running,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// Readiness check endpoint for Kubernetes probes.
///
/// Returns 200 OK while the audit writer accepts entries and 503 Service
/// Unavailable once it has stopped, so traffic drains before shutdown.
///
/// # Usage
///
/// Configure in Kubernetes:
/// ```yaml
/// readinessProbe:
///   httpGet:
///     path: /ready
///     port: 3000
///   initialDelaySeconds: 5
///   periodSeconds: 10
/// ```
#[instrument(skip(state))]
pub async fn readiness_check(State(state): State<AppState>) -> Result<StatusCode, StatusCode> {
    if state.audit_writer.is_running() {
        Ok(StatusCode::OK)
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
