use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Credential;

/// Response envelope used by all business handlers.
///
/// Field casing is part of the wire contract consumed by existing clients
/// (`StatusCode`, `TimeStamp`, `Data`, snake_case `error_detail`), hence the
/// explicit renames. Guard rejections bypass this envelope and use the flat
/// rejection shape built in the middleware module.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T: Serialize> {
    #[serde(rename = "StatusCode")]
    pub status_code: u16,
    #[serde(rename = "TimeStamp")]
    pub timestamp: DateTime<Utc>,
    pub path: String,
    pub message: String,
    #[serde(rename = "Data", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Internal failure detail, set on 500 responses only. Validation
    /// rejections carry their reason in `message` and leave this unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl<T: Serialize> ApiEnvelope<T> {
    /// Build a 200 OK envelope.
    pub fn success(path: impl Into<String>, message: impl Into<String>, data: T) -> Self {
        Self::with_status(200, path, message, data)
    }

    /// Build a 201 Created envelope.
    pub fn created(path: impl Into<String>, message: impl Into<String>, data: T) -> Self {
        Self::with_status(201, path, message, data)
    }

    fn with_status(
        status_code: u16,
        path: impl Into<String>,
        message: impl Into<String>,
        data: T,
    ) -> Self {
        Self {
            status_code,
            timestamp: Utc::now(),
            path: path.into(),
            message: message.into(),
            data: Some(data),
            error_detail: None,
        }
    }
}

impl ApiEnvelope<()> {
    /// Build a 400 Bad Request envelope carrying a validation message.
    pub fn bad_request(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::error(400, path, message, None)
    }

    /// Build a 500 Internal Server Error envelope.
    ///
    /// `message` is the stable per-endpoint failure message; `error_detail`
    /// carries the underlying cause for operators.
    pub fn server_error(
        path: impl Into<String>,
        message: impl Into<String>,
        error_detail: impl Into<String>,
    ) -> Self {
        Self::error(500, path, message, Some(error_detail.into()))
    }

    fn error(
        status_code: u16,
        path: impl Into<String>,
        message: impl Into<String>,
        error_detail: Option<String>,
    ) -> Self {
        Self {
            status_code,
            timestamp: Utc::now(),
            path: path.into(),
            message: message.into(),
            data: None,
            error_detail,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiEnvelope<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Request body for `POST /api/v1/generate-token`.
///
/// Fields are optional so missing values produce the documented messages
/// rather than a generic deserialization error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTokenRequest {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
}

/// Issued token payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Request body for `POST /api/v1/create-account`.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    #[serde(default)]
    pub portfolio: Option<String>,
}

/// Request body for `PUT /api/v1/update-account/{accountId}`.
///
/// All fields are optional; absent fields leave the credential unchanged.
/// `rotate_key` takes precedence over `new_api_key` when both are present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub rotate_key: Option<bool>,
    #[serde(default)]
    pub new_api_key: Option<String>,
    #[serde(default)]
    pub portfolio: Option<String>,
    #[serde(default)]
    pub is_active: Option<i32>,
}

/// Credential details returned by the admin endpoints.
///
/// Creation responses carry the `created*` pair; update responses carry the
/// `updated*` pair. `is_active` stays numeric on the wire for compatibility
/// with the upstream schema.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountData {
    pub id: Uuid,
    pub api_key: String,
    pub account_id: String,
    pub portfolio: String,
    pub is_active: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl AccountData {
    /// Shape for a freshly created credential.
    pub fn from_created(credential: &Credential) -> Self {
        Self {
            id: credential.id,
            api_key: credential.api_key.clone(),
            account_id: credential.account_id.clone(),
            portfolio: credential.portfolio.clone(),
            is_active: i32::from(credential.is_active),
            created_at: Some(credential.created_at),
            created_by: credential.created_by.clone(),
            updated_at: None,
            updated_by: None,
        }
    }

    /// Shape for an updated credential.
    pub fn from_updated(credential: &Credential) -> Self {
        Self {
            id: credential.id,
            api_key: credential.api_key.clone(),
            account_id: credential.account_id.clone(),
            portfolio: credential.portfolio.clone(),
            is_active: i32::from(credential.is_active),
            created_at: None,
            created_by: None,
            updated_at: Some(credential.updated_at),
            updated_by: credential.updated_by.clone(),
        }
    }
}

/// Vendor webhook callback body.
///
/// The vendor schema is loosely specified; everything is optional and
/// unknown fields are ignored so schema drift never breaks the endpoint.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub payload: Option<WebhookPayload>,
}

/// Nested payload of a webhook callback.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub kyc_request: Option<KycRequestUpdate>,
}

/// Verification state reported for one vendor request.
#[derive(Debug, Deserialize)]
pub struct KycRequestUpdate {
    /// Vendor request identifier (KID)
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Acknowledgment payload for webhook callbacks.
#[derive(Debug, Serialize)]
pub struct WebhookData {
    pub status: String,
    pub kid: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service health status
    pub status: String,
    /// Whether the audit writer task is accepting entries
    pub audit_writer_running: bool,
    /// Service version
    pub version: String,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}
