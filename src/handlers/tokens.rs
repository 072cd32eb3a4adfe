//! Token issuance endpoint.
//!
//! # Endpoints
//!
//! - `POST /api/v1/generate-token` - Issue a short-lived bearer token

use axum::Json;
use axum::extract::State;
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use tracing::{error, instrument, warn};

use crate::error::AppError;
use crate::handlers::util::trimmed;
use crate::models::{ApiEnvelope, GenerateTokenRequest};
use crate::state::AppState;

/// Issue a signed bearer token bound to a caller credential.
///
/// Public but audited. The key and account id must match an active
/// credential; the cross-checks happen in the token service.
///
/// # Request Body
///
/// ```json
/// {
///   "apiKey": "ABCD1234EFGH5678",
///   "accountId": "123456789"
/// }
/// ```
///
/// # Responses
///
/// - `200 OK` - Envelope with `{token, expiresAt}`
/// - `400 Bad Request` - Missing fields or credential mismatch
/// - `500 Internal Server Error` - Storage or signing failure
#[instrument(skip(state, payload))]
pub async fn generate_token(
    State(state): State<AppState>,
    uri: Uri,
    Json(payload): Json<GenerateTokenRequest>,
) -> Response {
    let path = uri.path();

    let Some(api_key) = trimmed(&payload.api_key) else {
        return ApiEnvelope::bad_request(path, "apiKey is required").into_response();
    };
    let Some(account_id) = trimmed(&payload.account_id) else {
        return ApiEnvelope::bad_request(path, "accountId is required").into_response();
    };

    match state.tokens.generate(api_key, account_id).await {
        Ok(data) => {
            ApiEnvelope::success(path, "Token generated successfully", data).into_response()
        }
        Err(AppError::BadRequest(message)) => {
            warn!(message = %message, "Token request rejected");
            ApiEnvelope::bad_request(path, message).into_response()
        }
        Err(err) => {
            error!(error = %err, "Token generation failed");
            ApiEnvelope::server_error(path, "Token generation failed", err.to_string())
                .into_response()
        }
    }
}
