use crate::error::{AppError, AppResult};

// =============================================================================
// Validation Constants
// =============================================================================

/// Exact length of a caller API key.
///
/// Keys are generated server-side and always match `^[A-Za-z0-9]{16}$`.
pub const API_KEY_LENGTH: usize = 16;

/// Exact length of a business account identifier.
pub const ACCOUNT_ID_LENGTH: usize = 9;

/// Maximum length of a portfolio label.
pub const PORTFOLIO_MAX_LENGTH: usize = 10;

/// Check whether a string is a well-formed API key (16 alphanumeric characters).
///
/// This is the shape check only; existence and active status are a storage
/// concern handled by the guards and services.
pub fn is_valid_api_key(key: &str) -> bool {
    key.len() == API_KEY_LENGTH && key.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Check whether a string is a well-formed account identifier (9 alphanumeric characters).
pub fn is_valid_account_id(id: &str) -> bool {
    id.len() == ACCOUNT_ID_LENGTH && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Check whether a string is a well-formed portfolio label (1-10 alphanumeric characters).
pub fn is_valid_portfolio(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= PORTFOLIO_MAX_LENGTH
        && name.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Validate an API key shape for token issuance.
pub fn validate_api_key(key: &str) -> AppResult<()> {
    if !is_valid_api_key(key) {
        return Err(AppError::BadRequest("Invalid API key format".to_string()));
    }
    Ok(())
}

/// Validate an account identifier shape for token issuance.
pub fn validate_account_id(id: &str) -> AppResult<()> {
    if !is_valid_account_id(id) {
        return Err(AppError::BadRequest(
            "Invalid account ID format (must be 9 alphanumeric characters)".to_string(),
        ));
    }
    Ok(())
}

/// Validate a portfolio label for account provisioning.
pub fn validate_portfolio(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::BadRequest(
            "Portfolio name is required".to_string(),
        ));
    }

    if !is_valid_portfolio(name) {
        return Err(AppError::BadRequest(
            "Portfolio name must be 1-10 alphanumeric characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate an `is_active` toggle value.
///
/// The stored flag is numeric for compatibility with the upstream schema,
/// so only 0 and 1 are accepted on the wire.
pub fn validate_is_active(value: i32) -> AppResult<()> {
    if value != 0 && value != 1 {
        return Err(AppError::BadRequest(
            "is_active must be 0 or 1".to_string(),
        ));
    }
    Ok(())
}
