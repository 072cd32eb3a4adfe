use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::{AppError, AppResult};
use crate::metrics::record_token_issued;
use crate::models::TokenData;
use crate::storage::CredentialStore;
use crate::token::TokenCodec;
use crate::validation;

/// Service for issuing caller tokens.
///
/// Issuance cross-checks the presented pair against the credential store:
/// the key must belong to an active credential and the account id must match
/// the stored record. A pair that fails here would also fail the caller
/// guard, so the checks and their messages line up with guard behavior.
#[derive(Clone)]
pub struct TokenService {
    credentials: Arc<dyn CredentialStore>,
    codec: TokenCodec,
}

impl TokenService {
    /// Create a new token service.
    pub fn new(credentials: Arc<dyn CredentialStore>, codec: TokenCodec) -> Self {
        Self { credentials, codec }
    }

    /// Issue a short-lived token for a verified key/account pair.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` when either value is malformed, the key
    /// is unknown or inactive, or the account id does not match the stored
    /// credential. Storage failures propagate as `AppError::Storage`.
    #[instrument(skip(self, api_key))]
    pub async fn generate(&self, api_key: &str, account_id: &str) -> AppResult<TokenData> {
        validation::validate_api_key(api_key)?;
        validation::validate_account_id(account_id)?;

        let credential = self
            .credentials
            .find_active_by_key(api_key)
            .await?
            .ok_or_else(|| {
                warn!("API key not found or not active");
                AppError::BadRequest("API key not found or inactive".to_string())
            })?;

        if credential.account_id != account_id {
            warn!(
                expected = %credential.account_id,
                "Account ID does not match the stored credential"
            );
            return Err(AppError::BadRequest("Account ID mismatch".to_string()));
        }

        let issued = self.codec.issue(api_key, account_id, &credential.portfolio)?;

        record_token_issued();
        info!("Token generated successfully");

        Ok(TokenData {
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }
}
