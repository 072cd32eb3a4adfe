//! Caller token issuance and verification.
//!
//! Tokens are HS256 JWTs binding an API key, account id, and portfolio for a
//! short, fixed lifetime. Encoding and decoding keys are derived once from the
//! configured secret and cached for the lifetime of the process.
//!
//! Verification collapses every failure mode (bad signature, malformed token,
//! expired) into the single opaque [`AppError::InvalidToken`] so responses
//! never reveal which check rejected the token.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Claims embedded in an issued caller token.
///
/// Wire names are camelCase to match what existing token holders present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    /// API key the token is bound to
    pub api_key: String,
    /// Account id the token is bound to
    pub account_id: String,
    /// Portfolio of the credential at issuance time
    pub portfolio: String,
    /// Issued-at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// A freshly issued token together with its advertised expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 token codec with pre-built keys.
///
/// Cheap to clone; the keys are shared behind `Arc`.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    /// Create a codec from the shared secret and token lifetime.
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let secret_bytes = secret.as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // No leeway: expiry is enforced to the second
        validation.leeway = 0;

        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret_bytes)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret_bytes)),
            validation,
            ttl,
        }
    }

    /// Issue a token for a verified credential.
    ///
    /// The returned `expires_at` is derived from the `exp` claim actually
    /// embedded in the token, so the advertised expiry and the enforced
    /// expiry can never drift apart.
    pub fn issue(
        &self,
        api_key: &str,
        account_id: &str,
        portfolio: &str,
    ) -> AppResult<IssuedToken> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| AppError::Internal(format!("Token TTL out of range: {e}")))?;

        let claims = TokenClaims {
            api_key: api_key.to_string(),
            account_id: account_id.to_string(),
            portfolio: portfolio.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token encoding failed: {e}")))?;

        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AppError::Internal("Token expiry out of range".to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidToken`] for any failure: bad signature,
    /// malformed structure, or an `exp` in the past.
    pub fn verify(&self, token: &str) -> AppResult<TokenClaims> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AppError::InvalidToken)?;

        Ok(data.claims)
    }

    /// Read the expiry of a token without enforcing it.
    ///
    /// The signature is still checked; returns `None` for tokens this codec
    /// did not sign or that cannot be decoded at all. Useful for inspecting
    /// already-expired tokens.
    pub fn expiry_of(&self, token: &str) -> Option<DateTime<Utc>> {
        let mut validation = self.validation.clone();
        validation.validate_exp = false;

        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation).ok()?;
        DateTime::from_timestamp(data.claims.exp, 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "unit-test-secret-0123456789-0123456789";
    const TEST_TTL: Duration = Duration::from_secs(15 * 60);

    fn codec() -> TokenCodec {
        TokenCodec::new(TEST_SECRET, TEST_TTL)
    }

    /// Sign arbitrary claims with the test secret, bypassing `issue` so tests
    /// can construct already-expired tokens.
    fn sign_raw(claims: &TokenClaims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_then_verify_round_trips_claims() {
        let codec = codec();
        let issued = codec
            .issue("ABCD1234EFGH5678", "123456789", "Retail")
            .unwrap();

        let claims = codec.verify(&issued.token).unwrap();
        assert_eq!(claims.api_key, "ABCD1234EFGH5678");
        assert_eq!(claims.account_id, "123456789");
        assert_eq!(claims.portfolio, "Retail");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_advertised_expiry_matches_embedded_claim() {
        let codec = codec();
        let issued = codec
            .issue("ABCD1234EFGH5678", "123456789", "Retail")
            .unwrap();

        let claims = codec.verify(&issued.token).unwrap();
        assert_eq!(issued.expires_at.timestamp(), claims.exp);

        let now = Utc::now();
        assert!(issued.expires_at > now);
        assert!(issued.expires_at <= now + chrono::Duration::seconds(15 * 60 + 1));
    }

    #[test]
    fn test_expired_token_rejected_without_leeway() {
        let codec = codec();
        let now = Utc::now().timestamp();

        // Expired only 5 seconds ago: a default 60s leeway would accept this
        let claims = TokenClaims {
            api_key: "ABCD1234EFGH5678".to_string(),
            account_id: "123456789".to_string(),
            portfolio: "Retail".to_string(),
            iat: now - 900,
            exp: now - 5,
        };

        let result = codec.verify(&sign_raw(&claims));
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let codec = codec();
        let issued = codec
            .issue("ABCD1234EFGH5678", "123456789", "Retail")
            .unwrap();

        let mut tampered = issued.token.clone();
        tampered.push('x');
        assert!(matches!(
            codec.verify(&tampered),
            Err(AppError::InvalidToken)
        ));

        assert!(matches!(
            codec.verify("not-a-jwt-at-all"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let codec = codec();
        let other = TokenCodec::new("a-completely-different-secret-0123456789", TEST_TTL);

        let issued = codec
            .issue("ABCD1234EFGH5678", "123456789", "Retail")
            .unwrap();

        assert!(other.verify(&issued.token).is_err());
    }

    #[test]
    fn test_expiry_of_reads_expired_tokens() {
        let codec = codec();
        let now = Utc::now().timestamp();

        let claims = TokenClaims {
            api_key: "ABCD1234EFGH5678".to_string(),
            account_id: "123456789".to_string(),
            portfolio: "Retail".to_string(),
            iat: now - 1_000,
            exp: now - 100,
        };
        let token = sign_raw(&claims);

        // verify refuses the token but expiry_of still reads the claim
        assert!(codec.verify(&token).is_err());
        let expiry = codec.expiry_of(&token).unwrap();
        assert_eq!(expiry.timestamp(), now - 100);

        assert!(codec.expiry_of("garbage").is_none());
    }

    #[test]
    fn test_claims_wire_casing() {
        let claims = TokenClaims {
            api_key: "ABCD1234EFGH5678".to_string(),
            account_id: "123456789".to_string(),
            portfolio: "Retail".to_string(),
            iat: 0,
            exp: 1,
        };

        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains("\"apiKey\""));
        assert!(json.contains("\"accountId\""));
        assert!(json.contains("\"portfolio\""));
    }
}
