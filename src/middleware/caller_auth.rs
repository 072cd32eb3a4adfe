//! Two-factor caller guard for the face-match endpoint.
//!
//! Callers must present both their own API key (`X-API-KEY`) and a bearer
//! token previously issued against that key. The guard checks, in order:
//!
//! 1. `X-API-KEY` present and non-blank
//! 2. `X-API-KEY` is 16 alphanumeric characters
//! 3. `Authorization: Bearer <token>` present
//! 4. Token signature and expiry verify
//! 5. Header key equals the key embedded in the token
//! 6. An active credential holds the key
//! 7. The credential's account id equals the token's account id
//!
//! Each step short-circuits with its own 401 message, so a failed caller
//! learns which requirement broke without learning anything about stored
//! keys. Cheap header checks run before signature verification, and
//! storage is only consulted once the token itself has passed. On success
//! the verified identity is stored in the request's [`RequestContext`] for
//! handlers and the audit recorder.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response, header};
use tower::{Layer, Service};
use tracing::{debug, error, warn};

use super::{constant_time_eq, service_unavailable_response, unauthorized_response};
use crate::context::{CallerIdentity, RequestContext};
use crate::error::AppError;
use crate::metrics::record_auth_failure;
use crate::paths;
use crate::storage::CredentialStore;
use crate::token::TokenCodec;
use crate::validation;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Guard label recorded with auth failure metrics.
const GUARD: &str = "caller";

/// Caller API key and bearer token guard layer.
#[derive(Clone)]
pub struct CallerAuthLayer {
    credentials: Arc<dyn CredentialStore>,
    codec: TokenCodec,
}

impl CallerAuthLayer {
    /// Create a guard verifying callers against `credentials` and `codec`.
    pub fn new(credentials: Arc<dyn CredentialStore>, codec: TokenCodec) -> Self {
        Self { credentials, codec }
    }
}

impl<S> Layer<S> for CallerAuthLayer {
    type Service = CallerAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CallerAuthService {
            inner,
            credentials: self.credentials.clone(),
            codec: self.codec.clone(),
        }
    }
}

/// Caller guard service wrapper.
#[derive(Clone)]
pub struct CallerAuthService<S> {
    inner: S,
    credentials: Arc<dyn CredentialStore>,
    codec: TokenCodec,
}

impl<S> Service<Request<Body>> for CallerAuthService<S>
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
        let codec = self.codec.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = req.uri().path().to_string();
            if !paths::requires_caller_auth(&path) {
                return inner.call(req).await;
            }

            let api_key = req
                .headers()
                .get(API_KEY_HEADER)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.trim().is_empty());

            let Some(api_key) = api_key else {
                warn!(path = %path, "Missing X-API-KEY header");
                record_auth_failure(GUARD);
                return Ok(unauthorized_response("Missing X-API-KEY header", &path));
            };

            if !validation::is_valid_api_key(api_key) {
                warn!(path = %path, "Malformed X-API-KEY header");
                record_auth_failure(GUARD);
                return Ok(unauthorized_response("Invalid X-API-KEY format", &path));
            }

            let token = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "));

            let Some(token) = token else {
                warn!(path = %path, "Missing or malformed Authorization header");
                record_auth_failure(GUARD);
                return Ok(unauthorized_response(
                    "Missing or invalid Authorization header",
                    &path,
                ));
            };

            let claims = match codec.verify(token) {
                Ok(claims) => claims,
                Err(AppError::InvalidToken) => {
                    warn!(path = %path, "Rejected bearer token");
                    record_auth_failure(GUARD);
                    return Ok(unauthorized_response("Invalid or expired JWT token", &path));
                }
                Err(err) => {
                    error!(path = %path, error = %err, "Unexpected token verification failure");
                    record_auth_failure(GUARD);
                    return Ok(unauthorized_response("Authentication failed", &path));
                }
            };

            if !constant_time_eq(api_key, &claims.api_key) {
                warn!(path = %path, "X-API-KEY does not match token binding");
                record_auth_failure(GUARD);
                return Ok(unauthorized_response(
                    "X-API-KEY does not match JWT token",
                    &path,
                ));
            }

            let credential = match credentials.find_active_by_key(api_key).await {
                Ok(found) => found,
                Err(err) => {
                    error!(path = %path, error = %err, "Credential lookup failed in caller guard");
                    return Ok(service_unavailable_response(
                        "Database service temporarily unavailable",
                        &path,
                    ));
                }
            };

            let Some(credential) = credential else {
                warn!(path = %path, "API key not found or not active");
                record_auth_failure(GUARD);
                return Ok(unauthorized_response("API key not found or inactive", &path));
            };

            if credential.account_id != claims.account_id {
                warn!(
                    path = %path,
                    account_id = %claims.account_id,
                    "Token account id does not match stored credential"
                );
                record_auth_failure(GUARD);
                return Ok(unauthorized_response("Account ID mismatch", &path));
            }

            if let Some(context) = req.extensions().get::<RequestContext>() {
                context
                    .set_identity(CallerIdentity {
                        api_key: claims.api_key.clone(),
                        account_id: claims.account_id.clone(),
                        portfolio: claims.portfolio.clone(),
                    })
                    .await;
            }

            debug!(
                account_id = %claims.account_id,
                portfolio = %claims.portfolio,
                "Caller authentication successful"
            );
            inner.call(req).await
        })
    }
}
