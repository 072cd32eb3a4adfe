//! Account provisioning endpoints.
//!
//! # Endpoints
//!
//! - `POST /api/v1/create-account` - Provision a credential with a generated key
//! - `PUT /api/v1/update-account/{accountId}` - Rotate or update a credential
//!
//! Both sit behind the admin guard; the acting user comes from the
//! `X-Requested-By` header and defaults to `"admin"`.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Response};
use tracing::{error, instrument, warn};

use crate::error::AppError;
use crate::handlers::util::{requested_by, trimmed};
use crate::models::{AccountData, ApiEnvelope, CreateAccountRequest, UpdateAccountRequest};
use crate::state::AppState;

/// Provision a new caller credential.
///
/// The API key and account id are generated server side; the response is
/// the only place the key is ever returned in full.
///
/// # Request Body
///
/// ```json
/// {
///   "portfolio": "Retail"
/// }
/// ```
///
/// # Responses
///
/// - `201 Created` - Envelope with the new credential
/// - `400 Bad Request` - Missing or malformed portfolio
/// - `500 Internal Server Error` - Storage or key generation failure
#[instrument(skip(state, headers, payload))]
pub async fn create_account(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    Json(payload): Json<CreateAccountRequest>,
) -> Response {
    let path = uri.path();
    let created_by = requested_by(&headers);

    let Some(portfolio) = trimmed(&payload.portfolio) else {
        return ApiEnvelope::bad_request(path, "Portfolio is required").into_response();
    };

    match state.accounts.create(portfolio, &created_by).await {
        Ok(credential) => ApiEnvelope::created(
            path,
            "Account created successfully",
            AccountData::from_created(&credential),
        )
        .into_response(),
        Err(AppError::BadRequest(message)) => {
            warn!(message = %message, "Account creation rejected");
            ApiEnvelope::bad_request(path, message).into_response()
        }
        Err(err) => {
            error!(error = %err, "Account creation failed");
            ApiEnvelope::server_error(path, "Account creation failed", err.to_string())
                .into_response()
        }
    }
}

/// Update or rotate an existing credential.
///
/// All body fields are optional; absent fields keep their stored values.
/// `rotateKey` wins over `newApiKey` when both are present.
///
/// # Request Body
///
/// ```json
/// {
///   "rotateKey": true,
///   "newApiKey": "ABCD1234EFGH5678",
///   "portfolio": "Retail",
///   "isActive": 1
/// }
/// ```
///
/// # Responses
///
/// - `200 OK` - Envelope with the updated credential
/// - `400 Bad Request` - Unknown account or malformed field
/// - `500 Internal Server Error` - Storage failure
#[instrument(skip(state, headers, payload), fields(account_id = %account_id))]
pub async fn update_account(
    State(state): State<AppState>,
    uri: Uri,
    Path(account_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateAccountRequest>,
) -> Response {
    let path = uri.path();
    let updated_by = requested_by(&headers);

    match state.accounts.update(&account_id, &payload, &updated_by).await {
        Ok(credential) => ApiEnvelope::success(
            path,
            "Account updated successfully",
            AccountData::from_updated(&credential),
        )
        .into_response(),
        Err(AppError::BadRequest(message)) => {
            warn!(message = %message, "Account update rejected");
            ApiEnvelope::bad_request(path, message).into_response()
        }
        Err(err) => {
            error!(error = %err, "Account update failed");
            ApiEnvelope::server_error(path, "Account update failed", err.to_string())
                .into_response()
        }
    }
}
