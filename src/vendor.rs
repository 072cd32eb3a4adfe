//! Vendor face-compare integration.
//!
//! The gateway submits compare requests to an external verification vendor
//! and learns the outcome later through the webhook endpoint. [`CompareClient`]
//! is the seam between the pipeline and that vendor; [`SandboxCompare`] is the
//! default implementation and fabricates responses in the vendor's wire shape
//! so the whole flow runs without network access or vendor credentials.
//!
//! The vendor identifies each compare request with a KID (`id` in the
//! response body). The KID doubles as the audit correlation id and as the key
//! of the transaction record the webhook upserts.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Template the vendor applies to every compare request.
const TEMPLATE_NAME: &str = "SELFIE COMPARE";

/// Days until an open compare request expires.
const EXPIRE_IN_DAYS: i64 = 90;

/// Base URL of the vendor's hosted verification page.
const VERIFY_GATEWAY_BASE: &str = "https://verify.example.com/gateway/login";

/// Where the hosted page sends the customer once verification finishes.
pub const DEFAULT_RETURN_URL: &str = "https://portal.example.com/verification/complete";

/// Outcome of a vendor compare request.
#[derive(Debug, Clone)]
pub struct CompareResponse {
    /// Vendor-issued request identifier, when the body carries one
    pub kid: Option<String>,
    /// Full parsed response body, returned verbatim to non-redirect callers
    pub parsed: Value,
}

impl CompareResponse {
    /// Wrap a parsed vendor body, lifting out the KID.
    pub fn from_parsed(parsed: Value) -> Self {
        let kid = parsed
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self { kid, parsed }
    }
}

/// Client for the external face-compare vendor.
#[async_trait]
pub trait CompareClient: Send + Sync {
    /// Submit a compare request for one customer image.
    ///
    /// `notify_customer` asks the vendor to contact the customer directly;
    /// it is turned off when the caller will hand out a redirect URL instead.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` when a required input is empty and
    /// `AppError::Vendor` when the vendor call itself fails.
    async fn create_request(
        &self,
        customer_name: &str,
        customer_identifier: &str,
        base64_image: &str,
        notify_customer: bool,
    ) -> AppResult<CompareResponse>;
}

/// In-process stand-in for the vendor compare service.
///
/// Applies the same input validation as the real client and fabricates a
/// response with a fresh KID. KIDs embed the date and a sequence number so
/// they stay readable in logs and audit records.
#[derive(Debug, Default)]
pub struct SandboxCompare {
    sequence: AtomicU64,
}

impl SandboxCompare {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_kid(&self) -> String {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("KID{}{n:06}", Utc::now().format("%y%m%d"))
    }
}

#[async_trait]
impl CompareClient for SandboxCompare {
    #[instrument(skip_all, fields(customer_identifier = %customer_identifier))]
    async fn create_request(
        &self,
        customer_name: &str,
        customer_identifier: &str,
        base64_image: &str,
        notify_customer: bool,
    ) -> AppResult<CompareResponse> {
        if customer_name.is_empty() || customer_identifier.is_empty() || base64_image.is_empty() {
            return Err(AppError::BadRequest(
                "Customer name, customer identifier, and image are required".to_string(),
            ));
        }

        let kid = self.next_kid();
        let now = Utc::now();

        let parsed = json!({
            "id": kid,
            "customer_identifier": customer_identifier,
            "customer_name": customer_name,
            "reference_id": "",
            "template_name": TEMPLATE_NAME,
            "notify_customer": notify_customer,
            "expire_in_days": EXPIRE_IN_DAYS,
            "status": "requested",
            "created_at": now.to_rfc3339(),
            "transaction_id": format!("TXN{}", Uuid::new_v4().simple()),
            "access_token": {
                "id": format!("GWT{}", Uuid::new_v4().simple()),
                "entity_id": kid,
                "valid_till": (now + chrono::Duration::days(EXPIRE_IN_DAYS)).to_rfc3339(),
            },
        });

        debug!(kid = %kid, "Sandbox compare request created");

        Ok(CompareResponse::from_parsed(parsed))
    }
}

/// Build the hosted-verification redirect URL from a vendor response body.
///
/// Format: `{base}/{kid}/{transaction_id}/{customer_identifier}` with
/// `token_id` and the encoded `redirect_url` as query parameters. A missing
/// `transaction_id` gets a generated placeholder; the other fields are
/// required.
///
/// # Errors
///
/// Returns `AppError::BadRequest` when `id`, `customer_identifier`, or
/// `access_token.id` is absent from the body.
pub fn build_redirect_url(parsed: &Value, return_url: &str) -> AppResult<String> {
    let kid = parsed.get("id").and_then(Value::as_str);
    let signer = parsed.get("customer_identifier").and_then(Value::as_str);
    let token_id = parsed.pointer("/access_token/id").and_then(Value::as_str);

    let (Some(kid), Some(signer), Some(token_id)) = (kid, signer, token_id) else {
        return Err(AppError::BadRequest(
            "Missing required fields: id, customer_identifier, or access_token.id".to_string(),
        ));
    };

    let transaction_id = match parsed.get("transaction_id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => format!("RANDOM-TXN-{}", Utc::now().timestamp_millis()),
    };

    let mut url = Url::parse(VERIFY_GATEWAY_BASE)
        .map_err(|e| AppError::Internal(format!("Invalid verification gateway base: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| AppError::Internal("Verification gateway base cannot be a base".to_string()))?
        .extend([kid, transaction_id.as_str(), signer]);
    url.query_pairs_mut()
        .append_pair("token_id", token_id)
        .append_pair("redirect_url", return_url);

    let url = url.to_string();
    debug!(url = %url, "Built verification redirect URL");

    Ok(url)
}

/// Encode raw image bytes as standard base64 without a data-URI prefix.
pub fn image_to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample_parsed() -> Value {
        json!({
            "id": "KID250823000001",
            "customer_identifier": "9876543210",
            "transaction_id": "TXNabc123",
            "access_token": { "id": "GWTdef456" },
        })
    }

    #[tokio::test]
    async fn test_sandbox_response_carries_kid_and_token() {
        let client = SandboxCompare::new();

        let response = client
            .create_request("Asha", "9876543210", "aGVsbG8=", true)
            .await
            .unwrap();

        let kid = response.kid.unwrap();
        assert!(kid.starts_with("KID"));
        assert_eq!(response.parsed["id"].as_str().unwrap(), kid);
        assert_eq!(response.parsed["customer_identifier"], "9876543210");
        assert_eq!(response.parsed["notify_customer"], true);
        assert!(
            response.parsed["access_token"]["id"]
                .as_str()
                .unwrap()
                .starts_with("GWT")
        );
    }

    #[tokio::test]
    async fn test_sandbox_kids_are_unique() {
        let client = SandboxCompare::new();

        let first = client
            .create_request("Asha", "9876543210", "aGVsbG8=", true)
            .await
            .unwrap();
        let second = client
            .create_request("Asha", "9876543210", "aGVsbG8=", true)
            .await
            .unwrap();

        assert_ne!(first.kid, second.kid);
    }

    #[tokio::test]
    async fn test_sandbox_rejects_empty_inputs() {
        let client = SandboxCompare::new();

        for (name, identifier, image) in [
            ("", "9876543210", "aGVsbG8="),
            ("Asha", "", "aGVsbG8="),
            ("Asha", "9876543210", ""),
        ] {
            let err = client
                .create_request(name, identifier, image, true)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::BadRequest(ref message)
                if message == "Customer name, customer identifier, and image are required"));
        }
    }

    #[test]
    fn test_redirect_url_format() {
        let url = build_redirect_url(&sample_parsed(), "https://portal.example.com/done").unwrap();

        assert!(url.starts_with(
            "https://verify.example.com/gateway/login/KID250823000001/TXNabc123/9876543210?"
        ));
        assert!(url.contains("token_id=GWTdef456"));
        // The return URL must be form-encoded inside the query string
        assert!(url.contains("redirect_url=https%3A%2F%2Fportal.example.com%2Fdone"));
    }

    #[test]
    fn test_redirect_url_generates_transaction_placeholder() {
        let mut parsed = sample_parsed();
        parsed.as_object_mut().unwrap().remove("transaction_id");

        let url = build_redirect_url(&parsed, DEFAULT_RETURN_URL).unwrap();
        assert!(url.contains("/RANDOM-TXN-"));
    }

    #[test]
    fn test_redirect_url_requires_access_token() {
        let mut parsed = sample_parsed();
        parsed.as_object_mut().unwrap().remove("access_token");

        let err = build_redirect_url(&parsed, DEFAULT_RETURN_URL).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref message)
            if message == "Missing required fields: id, customer_identifier, or access_token.id"));
    }

    #[test]
    fn test_redirect_url_from_sandbox_body_round_trips() {
        let parsed = json!({
            "id": "KID250823000002",
            "customer_identifier": "user@example.com",
            "transaction_id": "TXN0001",
            "access_token": { "id": "GWT0001" },
        });

        let url = build_redirect_url(&parsed, DEFAULT_RETURN_URL).unwrap();
        // '@' is a legal path character and passes through unencoded
        assert!(url.contains("/TXN0001/user@example.com?"));
    }

    #[test]
    fn test_image_to_base64_is_standard_no_prefix() {
        let encoded = image_to_base64(b"hello");
        assert_eq!(encoded, "aGVsbG8=");
        assert!(!encoded.starts_with("data:"));
    }
}
