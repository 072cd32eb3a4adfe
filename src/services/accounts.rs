use std::sync::Arc;

use chrono::Utc;
use rand::seq::IndexedRandom;
use tracing::{info, instrument};

use crate::error::{AppError, AppResult};
use crate::models::{Credential, UpdateAccountRequest};
use crate::storage::CredentialStore;
use crate::validation;

/// Character set for generated API keys. Uppercase plus digits; validation
/// still accepts mixed case for externally supplied keys.
const API_KEY_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Character set for generated account identifiers.
const ACCOUNT_ID_CHARSET: &[u8] = b"0123456789";

/// Attempts at drawing an unused key before giving up. With a 36^16 keyspace
/// a second draw is already vanishingly rare.
const MAX_KEY_DRAWS: usize = 8;

/// Service for provisioning and updating caller credentials.
///
/// Key material is generated server-side on creation; rotation accepts either
/// a fresh server-side key (`rotate_key`) or a caller-supplied one, with
/// duplicate keys rejected across all records.
#[derive(Clone)]
pub struct AccountService {
    credentials: Arc<dyn CredentialStore>,
}

impl AccountService {
    /// Create a new account service.
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }

    /// Provision a new credential for a portfolio.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` when the portfolio is missing or
    /// malformed. Storage failures propagate as `AppError::Storage`.
    #[instrument(skip(self))]
    pub async fn create(&self, portfolio: &str, created_by: &str) -> AppResult<Credential> {
        validation::validate_portfolio(portfolio)?;

        let api_key = self.draw_unused_api_key().await?;
        let account_id = random_string(ACCOUNT_ID_CHARSET, validation::ACCOUNT_ID_LENGTH);

        let credential = Credential::new(api_key, account_id, portfolio, created_by);
        let saved = self.credentials.save(credential).await?;

        info!(
            id = %saved.id,
            account_id = %saved.account_id,
            "Account created successfully"
        );

        Ok(saved)
    }

    /// Apply a partial update to an existing credential.
    ///
    /// `rotate_key` wins over `new_api_key` when both are present. Fields
    /// left `None` (or empty) keep their stored values.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` when the account is unknown, a supplied
    /// key or portfolio is malformed, the key is already in use by another
    /// record, or `is_active` is not 0/1.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        account_id: &str,
        update: &UpdateAccountRequest,
        updated_by: &str,
    ) -> AppResult<Credential> {
        let mut credential = self
            .credentials
            .find_by_account_id(account_id)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest(format!("Account not found with accountId: {account_id}"))
            })?;

        if update.rotate_key.unwrap_or(false) {
            credential.api_key = self.draw_unused_api_key().await?;
        } else if let Some(new_key) = update.new_api_key.as_deref().filter(|k| !k.is_empty()) {
            if !validation::is_valid_api_key(new_key) {
                return Err(AppError::BadRequest(
                    "Invalid new API key format".to_string(),
                ));
            }

            // Re-submitting the current key is a no-op, not a duplicate
            if new_key != credential.api_key && self.credentials.exists_by_key(new_key).await? {
                return Err(AppError::BadRequest(
                    "New API key already exists".to_string(),
                ));
            }

            credential.api_key = new_key.to_string();
        }

        if let Some(portfolio) = update.portfolio.as_deref().filter(|p| !p.is_empty()) {
            if !validation::is_valid_portfolio(portfolio) {
                return Err(AppError::BadRequest(
                    "Portfolio must be 1-10 alphanumeric characters".to_string(),
                ));
            }
            credential.portfolio = portfolio.to_string();
        }

        if let Some(is_active) = update.is_active {
            validation::validate_is_active(is_active)?;
            credential.is_active = is_active == 1;
        }

        credential.updated_by = Some(updated_by.to_string());
        credential.updated_at = Utc::now();

        let saved = self.credentials.save(credential).await?;

        info!(updated_by = %updated_by, "Account updated successfully");

        Ok(saved)
    }

    /// Draw a generated API key not currently present in the store.
    async fn draw_unused_api_key(&self) -> AppResult<String> {
        for _ in 0..MAX_KEY_DRAWS {
            let candidate = random_string(API_KEY_CHARSET, validation::API_KEY_LENGTH);
            if !self.credentials.exists_by_key(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(AppError::Internal(
            "Could not generate an unused API key".to_string(),
        ))
    }
}

fn random_string(charset: &[u8], length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .filter_map(|_| charset.choose(&mut rng))
        .map(|&b| b as char)
        .collect()
}
