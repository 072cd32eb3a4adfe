//! HTTP middleware implementing the authenticated-and-audited pipeline.
//!
//! # Architecture
//!
//! ```text
//! Request → Request ID → Audit (entry) → Body Cache → Admin Guard → Caller Guard → Handler
//!                            │                            │              │
//!                            │                         401/503        401/503
//!                            └── Audit (completion) ← Response ←────────┘
//! ```
//!
//! Guards short-circuit with the flat rejection shape below; because the
//! audit recorder sits outside them, rejected requests are recorded exactly
//! like successful ones.
//!
//! # Rejection Shape
//!
//! Guard rejections bypass the response envelope and use the flat shape
//! existing clients expect:
//!
//! ```json
//! {
//!   "timestamp": "2024-01-15T10:30:00Z",
//!   "status": 401,
//!   "error": "Unauthorized",
//!   "message": "Missing X-API-KEY header",
//!   "path": "/api/v1/face-match"
//! }
//! ```

use axum::Json;
use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use chrono::Utc;
use serde::Serialize;
use subtle::ConstantTimeEq;

pub mod admin_auth;
pub mod audit;
pub mod body_cache;
pub mod caller_auth;
pub mod ip;
pub mod request_id;

pub use admin_auth::AdminAuthLayer;
pub use audit::AuditLayer;
pub use body_cache::BodyCacheLayer;
pub use caller_auth::CallerAuthLayer;
pub use ip::{UNKNOWN_IP, extract_client_ip};
pub use request_id::RequestIdLayer;

/// Flat rejection body emitted by the guards.
#[derive(Debug, Serialize)]
struct GuardRejection {
    timestamp: String,
    status: u16,
    error: &'static str,
    message: String,
    path: String,
}

/// Build a 401 guard rejection.
pub fn unauthorized_response(message: &str, path: &str) -> Response<Body> {
    rejection_response(StatusCode::UNAUTHORIZED, "Unauthorized", message, path)
}

/// Build a 503 guard rejection for storage outages.
pub fn service_unavailable_response(message: &str, path: &str) -> Response<Body> {
    rejection_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "Service Unavailable",
        message,
        path,
    )
}

fn rejection_response(
    status: StatusCode,
    error: &'static str,
    message: &str,
    path: &str,
) -> Response<Body> {
    let body = GuardRejection {
        timestamp: Utc::now().to_rfc3339(),
        status: status.as_u16(),
        error,
        message: message.to_string(),
        path: path.to_string(),
    };

    (status, Json(body)).into_response()
}

/// Compare two key strings in constant time.
///
/// Both guards validate presented keys with this so response timing does not
/// leak how much of a key matched.
pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unauthorized_rejection_shape() {
        let response = unauthorized_response("Missing X-API-KEY header", "/api/v1/face-match");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["status"], 401);
        assert_eq!(json["error"], "Unauthorized");
        assert_eq!(json["message"], "Missing X-API-KEY header");
        assert_eq!(json["path"], "/api/v1/face-match");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_service_unavailable_rejection_shape() {
        let response = service_unavailable_response(
            "Database service temporarily unavailable",
            "/api/v1/face-match",
        );
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["status"], 503);
        assert_eq!(json["error"], "Service Unavailable");
    }

    #[test]
    fn test_constant_time_eq_equal() {
        assert!(constant_time_eq("ABCD1234EFGH5678", "ABCD1234EFGH5678"));
    }

    #[test]
    fn test_constant_time_eq_not_equal() {
        assert!(!constant_time_eq("ABCD1234EFGH5678", "ABCD1234EFGH5679"));
    }

    #[test]
    fn test_constant_time_eq_different_lengths() {
        assert!(!constant_time_eq("short", "a-much-longer-key"));
    }
}
