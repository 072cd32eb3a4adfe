//! Wire-contract tests for the gateway's domain models.
//!
//! These lock down the serialized shapes existing clients depend on, driven
//! from outside the crate the way a client would see them. Behavior-level
//! coverage lives in each module's own tests.
//!
//! Run with: `cargo test --test model_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::Value;

/// Sorted key list of a JSON object.
fn sorted_keys(value: &Value) -> Vec<&str> {
    let mut keys: Vec<&str> = value
        .as_object()
        .expect("expected a JSON object")
        .keys()
        .map(String::as_str)
        .collect();
    keys.sort_unstable();
    keys
}

/// Issued-token wire format
mod token_wire_tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::Utc;
    use fm_gateway::token::TokenCodec;
    use std::time::Duration;

    const SECRET: &str = "model-test-secret-0123456789-0123456789";
    const TTL: Duration = Duration::from_secs(15 * 60);

    /// Decode the claims segment of a JWT without verifying it.
    fn claims_of(token: &str) -> Value {
        let segment = token.split('.').nth(1).expect("token has no payload");
        let bytes = URL_SAFE_NO_PAD
            .decode(segment)
            .expect("payload is not base64url");
        serde_json::from_slice(&bytes).expect("payload is not JSON")
    }

    #[test]
    fn test_claim_names_match_existing_token_holders() {
        let codec = TokenCodec::new(SECRET, TTL);
        let issued = codec
            .issue("ABCD1234EFGH5678", "123456789", "Retail")
            .expect("issuance failed");

        let claims = claims_of(&issued.token);
        assert_eq!(
            sorted_keys(&claims),
            ["accountId", "apiKey", "exp", "iat", "portfolio"]
        );
        assert_eq!(claims["apiKey"], "ABCD1234EFGH5678");
        assert_eq!(claims["accountId"], "123456789");
        assert_eq!(claims["portfolio"], "Retail");
    }

    #[test]
    fn test_advertised_expiry_is_one_ttl_out() {
        let codec = TokenCodec::new(SECRET, TTL);
        let before = Utc::now().timestamp();
        let issued = codec
            .issue("ABCD1234EFGH5678", "123456789", "Retail")
            .expect("issuance failed");
        let after = Utc::now().timestamp();

        let ttl = TTL.as_secs() as i64;
        let exp = issued.expires_at.timestamp();
        assert!(exp >= before + ttl);
        assert!(exp <= after + ttl);

        // The embedded claim and the advertised expiry agree
        assert_eq!(claims_of(&issued.token)["exp"], exp);
    }
}

/// Response envelope wire format
mod envelope_wire_tests {
    use super::*;
    use fm_gateway::models::ApiEnvelope;
    use serde_json::json;

    #[test]
    fn test_success_envelope_key_set() {
        let envelope = ApiEnvelope::success(
            "/api/v1/generate-token",
            "Token generated successfully",
            json!({"token": "jwt"}),
        );
        let value = serde_json::to_value(&envelope).expect("serialization failed");

        assert_eq!(
            sorted_keys(&value),
            ["Data", "StatusCode", "TimeStamp", "message", "path"]
        );
    }

    #[test]
    fn test_server_error_envelope_key_set() {
        let envelope = ApiEnvelope::server_error(
            "/api/v1/face-match",
            "Failed to process face match request",
            "storage unavailable: pool exhausted",
        );
        let value = serde_json::to_value(&envelope).expect("serialization failed");

        assert_eq!(
            sorted_keys(&value),
            ["StatusCode", "TimeStamp", "error_detail", "message", "path"]
        );
        assert_eq!(value["StatusCode"], 500);
    }

    #[test]
    fn test_bad_request_envelope_key_set() {
        let envelope = ApiEnvelope::bad_request("/api/v1/create-account", "Portfolio is required");
        let value = serde_json::to_value(&envelope).expect("serialization failed");

        assert_eq!(
            sorted_keys(&value),
            ["StatusCode", "TimeStamp", "message", "path"]
        );
    }
}

/// Vendor webhook schema drift
mod webhook_wire_tests {
    use fm_gateway::models::WebhookRequest;

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{
            "id": "evt-1",
            "event": "kyc.completed",
            "signature": "sha256=abcdef",
            "payload": {
                "kyc_request": {
                    "id": "KID250823000001",
                    "status": "approved",
                    "score": 0.97,
                    "vendor_metadata": {"region": "ap-south-1"}
                },
                "attempt": 3
            }
        }"#;

        let request: WebhookRequest = serde_json::from_str(json).expect("parse failed");
        let kyc = request
            .payload
            .and_then(|payload| payload.kyc_request)
            .expect("kyc_request missing");

        assert_eq!(kyc.id.as_deref(), Some("KID250823000001"));
        assert_eq!(kyc.status.as_deref(), Some("approved"));
        assert!(kyc.reference_id.is_none());
    }

    #[test]
    fn test_partial_kyc_request_parses() {
        let json = r#"{"payload": {"kyc_request": {"id": "KID250823000002"}}}"#;

        let request: WebhookRequest = serde_json::from_str(json).expect("parse failed");
        let kyc = request
            .payload
            .and_then(|payload| payload.kyc_request)
            .expect("kyc_request missing");

        assert_eq!(kyc.id.as_deref(), Some("KID250823000002"));
        assert!(kyc.status.is_none());
        assert!(kyc.transaction_id.is_none());
    }
}

/// Admin account response wire format
mod account_wire_tests {
    use super::*;
    use fm_gateway::models::{AccountData, Credential};

    #[test]
    fn test_created_shape_key_set() {
        let credential = Credential::new("ABCD1234EFGH5678", "123456789", "Retail", "admin");
        let value = serde_json::to_value(AccountData::from_created(&credential))
            .expect("serialization failed");

        assert_eq!(
            sorted_keys(&value),
            [
                "accountId",
                "apiKey",
                "createdAt",
                "createdBy",
                "id",
                "isActive",
                "portfolio"
            ]
        );
        assert_eq!(value["isActive"], 1);
    }

    #[test]
    fn test_updated_shape_key_set() {
        let mut credential = Credential::new("ABCD1234EFGH5678", "123456789", "Retail", "admin");
        credential.updated_by = Some("ops".to_string());
        let value = serde_json::to_value(AccountData::from_updated(&credential))
            .expect("serialization failed");

        assert_eq!(
            sorted_keys(&value),
            [
                "accountId",
                "apiKey",
                "id",
                "isActive",
                "portfolio",
                "updatedAt",
                "updatedBy"
            ]
        );
        assert_eq!(value["updatedBy"], "ops");
    }
}
