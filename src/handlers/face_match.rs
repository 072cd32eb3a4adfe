//! Face-match submission and vendor webhook endpoints.
//!
//! # Endpoints
//!
//! - `POST /api/v1/face-match` - Submit a selfie for vendor comparison (multipart)
//! - `POST /api/v1/webhook` - Vendor callback with verification progress
//!
//! The face-match route sits behind the caller guard; the webhook is public
//! because the vendor cannot authenticate, but both are audited. Each handler
//! feeds the vendor request id (KID) into the [`RequestContext`] so the audit
//! entry correlates with the vendor transaction.

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use bytes::Bytes;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, error, info, instrument, warn};

use crate::context::RequestContext;
use crate::error::{AppError, AppResult};
use crate::models::{ApiEnvelope, KycRequestUpdate, Transaction, WebhookData, WebhookRequest};
use crate::state::AppState;
use crate::vendor;

/// Prefix of the base64 image kept in the canonical audit payload.
const BASE64_PREFIX_CHARS: usize = 200;

/// One uploaded file part from the multipart form.
struct ImageUpload {
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Bytes,
}

/// Collected multipart form fields; unknown parts are ignored.
#[derive(Default)]
struct FaceMatchForm {
    customer_name: String,
    customer_identifier: String,
    redirect_flag: String,
    image: Option<ImageUpload>,
}

/// Submit a face-match request to the vendor.
///
/// Multipart fields: `customer_name`, `customer_identifier`, `image`
/// (required), and `redirect_url` (optional, `"true"` to receive a hosted
/// verification link instead of the raw vendor response).
///
/// # Responses
///
/// - `200 OK` - Envelope with the vendor response, or `{redirect_url}` when
///   a redirect was requested
/// - `400 Bad Request` - Missing image or rejected form fields
/// - `500 Internal Server Error` - Vendor or processing failure
#[instrument(skip(state, context, multipart))]
pub async fn face_match(
    State(state): State<AppState>,
    uri: Uri,
    context: Option<Extension<RequestContext>>,
    multipart: Multipart,
) -> Response {
    let path = uri.path();
    let context = context.map(|Extension(context)| context);

    match process_face_match(&state, path, context.as_ref(), multipart).await {
        Ok(envelope) => envelope.into_response(),
        Err(AppError::BadRequest(message)) => {
            warn!(message = %message, "Face match request rejected");
            ApiEnvelope::bad_request(path, message).into_response()
        }
        Err(err) => {
            error!(error = %err, "Face match request failed");
            ApiEnvelope::server_error(
                path,
                "Failed to process face match request",
                err.to_string(),
            )
            .into_response()
        }
    }
}

/// Receive a vendor webhook callback.
///
/// Upserts the [`Transaction`] record keyed by the vendor KID and records
/// the KID as the audit correlation id. Unknown or partial payloads are
/// acknowledged rather than rejected; the vendor retries on non-2xx.
///
/// # Request Body
///
/// ```json
/// {
///   "id": "evt_01",
///   "event": "kyc.completed",
///   "payload": {
///     "kyc_request": {
///       "id": "KID240115000042",
///       "status": "approved",
///       "reference_id": "REF-1",
///       "transaction_id": "TXN-1"
///     }
///   }
/// }
/// ```
#[instrument(skip(state, context, payload))]
pub async fn webhook(
    State(state): State<AppState>,
    uri: Uri,
    context: Option<Extension<RequestContext>>,
    Json(payload): Json<WebhookRequest>,
) -> Response {
    let path = uri.path();
    let context = context.map(|Extension(context)| context);

    match process_webhook(&state, context.as_ref(), &payload).await {
        Ok(data) => {
            ApiEnvelope::success(path, "Webhook received and processed", data).into_response()
        }
        Err(err) => {
            error!(error = %err, "Webhook processing failed");
            ApiEnvelope::server_error(path, "Failed to process webhook", err.to_string())
                .into_response()
        }
    }
}

async fn process_face_match(
    state: &AppState,
    path: &str,
    context: Option<&RequestContext>,
    multipart: Multipart,
) -> AppResult<ApiEnvelope<Value>> {
    let form = read_form(multipart).await?;

    let Some(image) = form.image.as_ref().filter(|image| !image.bytes.is_empty()) else {
        return Err(AppError::BadRequest("Image file is required".to_string()));
    };

    let base64_image = vendor::image_to_base64(&image.bytes);
    debug!(
        image_bytes = image.bytes.len(),
        base64_length = base64_image.len(),
        "Image encoded for vendor submission"
    );

    let want_redirect = form.redirect_flag.eq_ignore_ascii_case("true");

    // The vendor notifies the customer directly unless we hand out a
    // redirect link ourselves.
    let response = state
        .compare
        .create_request(
            &form.customer_name,
            &form.customer_identifier,
            &base64_image,
            !want_redirect,
        )
        .await?;

    if let Some(context) = context {
        if let Some(kid) = response.kid.as_deref() {
            context.set_correlation_id(kid.to_string()).await;
        }
        let canonical = canonical_payload(&form, image, &base64_image, want_redirect);
        context.set_canonical_payload(canonical.to_string()).await;
    }

    info!(
        kid = response.kid.as_deref().unwrap_or("-"),
        want_redirect, "Face match request created"
    );

    if want_redirect {
        let redirect_url = vendor::build_redirect_url(&response.parsed, vendor::DEFAULT_RETURN_URL)?;
        return Ok(ApiEnvelope::success(
            path,
            "Redirect URL generated",
            json!({ "redirect_url": redirect_url }),
        ));
    }

    Ok(ApiEnvelope::success(
        path,
        "Face match request created successfully",
        response.parsed,
    ))
}

async fn process_webhook(
    state: &AppState,
    context: Option<&RequestContext>,
    payload: &WebhookRequest,
) -> AppResult<WebhookData> {
    let kyc_request = payload
        .payload
        .as_ref()
        .and_then(|payload| payload.kyc_request.as_ref());
    let kid = kyc_request.and_then(|update| update.id.as_deref());

    info!(
        webhook_id = payload.id.as_deref().unwrap_or("-"),
        event = payload.event.as_deref().unwrap_or("-"),
        kid = kid.unwrap_or("-"),
        status = kyc_request
            .and_then(|update| update.status.as_deref())
            .unwrap_or("-"),
        "Webhook received"
    );

    if let (Some(kid), Some(context)) = (kid, context) {
        context.set_correlation_id(kid.to_string()).await;
    }

    if let (Some(kid), Some(update)) = (kid, kyc_request) {
        upsert_transaction(state, kid, update).await?;
    }

    Ok(WebhookData {
        status: "received".to_string(),
        kid: kid.unwrap_or("N/A").to_string(),
    })
}

/// Create or update the transaction record for `kid`.
///
/// Repeated callbacks for the same KID overwrite the mutable fields, so the
/// store holds one row per vendor request regardless of delivery count.
async fn upsert_transaction(
    state: &AppState,
    kid: &str,
    update: &KycRequestUpdate,
) -> AppResult<()> {
    match state.transactions.find_by_kid(kid).await? {
        Some(mut transaction) => {
            transaction.status = update.status.clone();
            transaction.reference_id = update.reference_id.clone();
            transaction.transaction_id = update.transaction_id.clone();
            transaction.updated_at = Utc::now();
            state.transactions.save(transaction).await?;
            info!(kid = %kid, "Updated transaction record");
        }
        None => {
            let mut transaction = Transaction::new(kid);
            transaction.status = update.status.clone();
            transaction.reference_id = update.reference_id.clone();
            transaction.transaction_id = update.transaction_id.clone();
            state.transactions.save(transaction).await?;
            info!(kid = %kid, "Created transaction record");
        }
    }

    Ok(())
}

/// Read the multipart form, keeping the last occurrence of each known field.
async fn read_form(mut multipart: Multipart) -> AppResult<FaceMatchForm> {
    let mut form = FaceMatchForm {
        redirect_flag: "false".to_string(),
        ..FaceMatchForm::default()
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("customer_name") => form.customer_name = read_text(field).await?,
            Some("customer_identifier") => form.customer_identifier = read_text(field).await?,
            Some("redirect_url") => form.redirect_flag = read_text(field).await?,
            Some("image") => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.image = Some(ImageUpload {
                    filename,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: Field<'_>) -> AppResult<String> {
    field.text().await.map_err(multipart_error)
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart payload: {err}"))
}

/// Compact audit representation of the multipart submission.
///
/// The raw body is megabytes of image data; the audit trail stores the form
/// fields plus image metadata and a short base64 prefix instead.
fn canonical_payload(
    form: &FaceMatchForm,
    image: &ImageUpload,
    base64_image: &str,
    want_redirect: bool,
) -> Value {
    let base64_prefix: String = base64_image.chars().take(BASE64_PREFIX_CHARS).collect();

    json!({
        "customer_name": form.customer_name,
        "customer_identifier": form.customer_identifier,
        "redirect_url": want_redirect,
        "image": {
            "filename": image.filename,
            "contentType": image.content_type,
            "size": image.bytes.len(),
            "base64_length": base64_image.len(),
            "base64_prefix": base64_prefix,
        },
    })
}
