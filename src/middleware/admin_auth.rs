//! Administrative API key guard for account provisioning endpoints.
//!
//! Account creation and updates require the shared admin key in the
//! `X-Admin-API-KEY` header. The expected key is the active credential
//! stored under the reserved `Admin` portfolio, so it can be rotated
//! through the same provisioning flow it protects.
//!
//! The guard only inspects requests whose path needs it; everything else
//! passes through untouched. A missing header is rejected before any
//! storage lookup. Passing the guard authorizes the request but does not
//! establish a caller identity, so admin actions are attributed to the
//! operator default downstream.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::{debug, error, warn};

use super::{constant_time_eq, service_unavailable_response, unauthorized_response};
use crate::metrics::record_auth_failure;
use crate::paths;
use crate::storage::CredentialStore;

/// Header carrying the administrative API key.
pub const ADMIN_API_KEY_HEADER: &str = "x-admin-api-key";

/// Portfolio name reserved for the administrative credential.
pub const ADMIN_PORTFOLIO: &str = "Admin";

/// Guard label recorded with auth failure metrics.
const GUARD: &str = "admin";

/// Admin API key guard layer.
#[derive(Clone)]
pub struct AdminAuthLayer {
    credentials: Arc<dyn CredentialStore>,
}

impl AdminAuthLayer {
    /// Create a guard resolving the admin credential from `credentials`.
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }
}

impl<S> Layer<S> for AdminAuthLayer {
    type Service = AdminAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdminAuthService {
            inner,
            credentials: self.credentials.clone(),
        }
    }
}

/// Admin API key guard service wrapper.
#[derive(Clone)]
pub struct AdminAuthService<S> {
    inner: S,
    credentials: Arc<dyn CredentialStore>,
}

impl<S> Service<Request<Body>> for AdminAuthService<S>
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
        let credentials = self.credentials.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = req.uri().path().to_string();
            if !paths::requires_admin_key(&path) {
                return inner.call(req).await;
            }

            let provided = req
                .headers()
                .get(ADMIN_API_KEY_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty());

            let Some(provided) = provided else {
                warn!(path = %path, "Missing X-Admin-API-KEY header");
                record_auth_failure(GUARD);
                return Ok(unauthorized_response(
                    "Missing X-Admin-API-KEY header",
                    &path,
                ));
            };

            let admin = match credentials.find_active_by_portfolio(ADMIN_PORTFOLIO).await {
                Ok(admin) => admin,
                Err(err) => {
                    error!(path = %path, error = %err, "Credential lookup failed in admin guard");
                    return Ok(service_unavailable_response(
                        "Database service temporarily unavailable",
                        &path,
                    ));
                }
            };

            let Some(admin) = admin else {
                error!(path = %path, "Admin credential not provisioned");
                record_auth_failure(GUARD);
                return Ok(unauthorized_response("Admin configuration not found", &path));
            };

            if !constant_time_eq(provided, &admin.api_key) {
                warn!(path = %path, "Invalid admin API key attempt");
                record_auth_failure(GUARD);
                return Ok(unauthorized_response(
                    "Invalid or missing X-Admin-API-KEY header",
                    &path,
                ));
            }

            debug!(path = %path, "Admin API key accepted");
            inner.call(req).await
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::Credential;
    use crate::storage::{InMemoryCredentialStore, StorageError};
    use axum::http::{Method, StatusCode};
    use std::convert::Infallible;
    use tower::ServiceExt;

    const ADMIN_KEY: &str = "ADMIN1234KEY5678";

    /// Store whose every method reports an outage.
    struct FailingStore;

    #[async_trait::async_trait]
    impl CredentialStore for FailingStore {
        async fn find_active_by_key(
            &self,
            _api_key: &str,
        ) -> Result<Option<Credential>, StorageError> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }

        async fn find_active_by_portfolio(
            &self,
            _portfolio: &str,
        ) -> Result<Option<Credential>, StorageError> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }

        async fn find_by_account_id(
            &self,
            _account_id: &str,
        ) -> Result<Option<Credential>, StorageError> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }

        async fn exists_by_key(&self, _api_key: &str) -> Result<bool, StorageError> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }

        async fn save(&self, _credential: Credential) -> Result<Credential, StorageError> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }
    }

    fn ok_service() -> impl Service<
        Request<Body>,
        Response = Response<Body>,
        Error = Infallible,
        Future: Send,
    > + Clone
    + Send
    + 'static {
        tower::service_fn(|_req: Request<Body>| async move {
            Ok(Response::new(Body::from("passed")))
        })
    }

    fn admin_request(path: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::POST).uri(path);
        if let Some(key) = key {
            builder = builder.header("X-Admin-API-KEY", key);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn seeded_store() -> Arc<InMemoryCredentialStore> {
        let store = Arc::new(InMemoryCredentialStore::new());
        store
            .save(Credential::new(
                ADMIN_KEY,
                "000000001",
                ADMIN_PORTFOLIO,
                "seed",
            ))
            .await
            .unwrap();
        store
    }

    async fn rejection_message(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        json["message"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_non_admin_path_passes_without_header() {
        let service = AdminAuthLayer::new(seeded_store().await).layer(ok_service());
        let response = service
            .oneshot(admin_request("/api/v1/generate-token", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_header_is_rejected_before_storage() {
        // A failing store proves the lookup is skipped: a consulted store
        // would turn this into a 503.
        let service = AdminAuthLayer::new(Arc::new(FailingStore)).layer(ok_service());
        let response = service
            .oneshot(admin_request("/api/v1/create-account", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            rejection_message(response).await,
            "Missing X-Admin-API-KEY header"
        );
    }

    #[tokio::test]
    async fn test_blank_header_is_rejected() {
        let service = AdminAuthLayer::new(seeded_store().await).layer(ok_service());
        let response = service
            .oneshot(admin_request("/api/v1/create-account", Some("   ")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            rejection_message(response).await,
            "Missing X-Admin-API-KEY header"
        );
    }

    #[tokio::test]
    async fn test_unprovisioned_admin_credential_is_rejected() {
        let service =
            AdminAuthLayer::new(Arc::new(InMemoryCredentialStore::new())).layer(ok_service());
        let response = service
            .oneshot(admin_request("/api/v1/create-account", Some(ADMIN_KEY)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            rejection_message(response).await,
            "Admin configuration not found"
        );
    }

    #[tokio::test]
    async fn test_wrong_key_is_rejected() {
        let service = AdminAuthLayer::new(seeded_store().await).layer(ok_service());
        let response = service
            .oneshot(admin_request(
                "/api/v1/update-account/123456789",
                Some("WRONG0000KEY0000"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            rejection_message(response).await,
            "Invalid or missing X-Admin-API-KEY header"
        );
    }

    #[tokio::test]
    async fn test_correct_key_passes() {
        let service = AdminAuthLayer::new(seeded_store().await).layer(ok_service());
        let response = service
            .oneshot(admin_request("/api/v1/create-account", Some(ADMIN_KEY)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_storage_outage_is_a_503() {
        let service = AdminAuthLayer::new(Arc::new(FailingStore)).layer(ok_service());
        let response = service
            .oneshot(admin_request("/api/v1/create-account", Some(ADMIN_KEY)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            rejection_message(response).await,
            "Database service temporarily unavailable"
        );
    }
}
