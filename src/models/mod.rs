mod api;
mod audit;
mod credential;
mod transaction;

pub use api::{
    AccountData, ApiEnvelope, CreateAccountRequest, GenerateTokenRequest, HealthResponse,
    KycRequestUpdate, TokenData, UpdateAccountRequest, WebhookData, WebhookPayload, WebhookRequest,
};
pub use audit::{
    AuditEntry, MAX_ERROR_MESSAGE_CHARS, MAX_PAYLOAD_CHARS, TRUNCATION_MARKER,
    truncate_error_message, truncate_payload,
};
pub use credential::Credential;
pub use transaction::Transaction;
