use thiserror::Error;

use crate::storage::StorageError;

/// Application-wide error types.
///
/// # Status Mapping
///
/// The guards build their rejection responses directly, since they know the
/// request path and the flat shape existing clients expect. Handlers fold
/// these errors into the response envelope instead: `BadRequest` surfaces
/// as 400 with its message, everything else as 500 behind a fixed
/// per-endpoint message with the cause in `error_detail`.
///
/// # Authentication Errors
///
/// Token verification failures collapse into the single opaque
/// [`AppError::InvalidToken`], so responses never distinguish "tampered"
/// from "expired" from "malformed".
///
/// # Storage Errors
///
/// Storage failures inside a guard map to 503, distinct from 401, so
/// callers can tell "try again later" apart from "your key is wrong".
#[derive(Error, Debug)]
pub enum AppError {
    /// Request rejected before business logic; the message is client-facing.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Authentication failed with the generic per-case message.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bearer token failed verification.
    #[error("Invalid or expired JWT token")]
    InvalidToken,

    /// A storage backend was unreachable.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The vendor compare call failed. Constructed by real `CompareClient`
    /// implementations; the sandbox never fails this way.
    #[error("Vendor request failed: {0}")]
    Vendor(String),

    /// Invariant violation inside the service.
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Configuration could not be loaded or validated at startup.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_display_carries_message() {
        let err = AppError::BadRequest("apiKey is required".to_string());
        assert_eq!(err.to_string(), "Invalid request: apiKey is required");
    }

    #[test]
    fn test_invalid_token_display_is_opaque() {
        assert_eq!(
            AppError::InvalidToken.to_string(),
            "Invalid or expired JWT token"
        );
    }

    #[test]
    fn test_storage_error_converts() {
        let storage = StorageError::Unavailable("pool exhausted".to_string());
        let err = AppError::from(storage);

        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(
            err.to_string(),
            "Storage error: storage unavailable: pool exhausted"
        );
    }
}
