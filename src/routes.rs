//! Application routing configuration with the ordered middleware chain.
//!
//! # Middleware Chain (written order = execution order)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← Adds X-Request-Id header
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Tracing / CORS  │ ← HTTP logging, cross-origin headers
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Audit Recorder  │ ← Context + entry/completion (/api/v1 only)
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   Body Cache     │ ← Snapshots JSON bodies for the audit trail
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   Admin Guard    │ ← 401/503 on provisioning routes
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   Caller Guard   │ ← 401/503 on /api/v1/face-match
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! Guard rejections short-circuit below the audit recorder, so rejected
//! requests are recorded exactly like successful ones.
//!
//! # Route Groups
//!
//! - `/health`, `/ready` - Probes (unauthenticated, unaudited)
//! - `/api/v1/generate-token`, `/api/v1/webhook` - Public, audited
//! - `/api/v1/create-account`, `/api/v1/update-account/{id}` - Admin key
//! - `/api/v1/face-match` - Caller key + bearer token

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handlers;
use crate::middleware::{
    AdminAuthLayer, AuditLayer, BodyCacheLayer, CallerAuthLayer, RequestIdLayer,
};
use crate::paths;
use crate::state::AppState;

/// Upper bound on request bodies.
///
/// Face-match uploads are selfie captures; 10 MiB covers any reasonable
/// image while keeping pathological uploads out.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the application router with all routes and middleware configured.
///
/// The route table is fixed; see [`crate::paths`] for the classification
/// the guards and the audit recorder consult.
///
/// # Arguments
///
/// * `state` - Application state containing config, stores, and services
///
/// # Returns
///
/// Fully configured Axum router ready to be served.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let cors = build_cors_layer(&config.cors_allowed_origins);

    let router = Router::new()
        // Probes (outside the audit trail)
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        // Public business routes
        .route(paths::GENERATE_TOKEN, post(handlers::generate_token))
        .route(paths::WEBHOOK, post(handlers::webhook))
        // Admin provisioning routes
        .route(paths::CREATE_ACCOUNT, post(handlers::create_account))
        .route(
            "/api/v1/update-account/{account_id}",
            put(handlers::update_account),
        )
        // Caller routes
        .route(paths::FACE_MATCH, post(handlers::face_match));

    info!(
        body_cache_limit = config.body_cache_limit,
        audit_queue_capacity = config.audit_queue_capacity,
        "Audit pipeline configured"
    );

    if config.admin_key_configured() {
        info!("Admin credential configured");
    } else {
        warn!("ADMIN_API_KEY not set; admin routes will reject every request");
    }

    // ServiceBuilder applies layers top to bottom on the request path, so
    // this reads in execution order. The body cache must run before either
    // guard so nothing downstream sees a consumed body.
    let pipeline = ServiceBuilder::new()
        .layer(RequestIdLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(AuditLayer::new(state.audit_writer.clone()))
        .layer(BodyCacheLayer::new(config.body_cache_limit))
        .layer(AdminAuthLayer::new(state.credentials.clone()))
        .layer(CallerAuthLayer::new(
            state.credentials.clone(),
            state.codec.clone(),
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    router.layer(pipeline).with_state(state)
}

/// Build CORS layer from configuration.
///
/// # Arguments
///
/// * `allowed_origins` - List of allowed origins, or `["*"]` for any origin
///
/// # Security Note
///
/// Using `*` (any origin) is convenient for development but should be
/// avoided in production. Specify explicit origins instead.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_any = allowed_origins.iter().any(|origin| origin == "*");

    if allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use crate::config::Config;

    use super::*;

    #[test]
    fn test_build_cors_layer_any() {
        let origins = vec!["*".to_string()];
        let _layer = build_cors_layer(&origins);
        // Just verify it doesn't panic
    }

    #[test]
    fn test_build_cors_layer_specific() {
        let origins = vec![
            "https://example.com".to_string(),
            "https://app.example.com".to_string(),
        ];
        let _layer = build_cors_layer(&origins);
        // Just verify it doesn't panic
    }

    #[tokio::test]
    async fn test_build_router_assembles() {
        let state = AppState::new(Config::default()).await.unwrap();
        let _router = build_router(state.clone());
        state.shutdown().await;
    }
}
