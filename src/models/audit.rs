use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum stored length (in characters) for request and response snapshots.
pub const MAX_PAYLOAD_CHARS: usize = 10_000;

/// Marker appended to snapshots cut at [`MAX_PAYLOAD_CHARS`].
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Maximum stored length (in characters) for error messages. No marker is
/// appended; the cut is silent.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 4_000;

/// One audited HTTP exchange.
///
/// Entries are built synchronously when a response completes and persisted
/// asynchronously by the audit writer. Persistence failures are logged and
/// counted but never surfaced to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry identifier
    pub id: Uuid,
    /// Vendor correlation id (KID) when the exchange produced one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fm_transaction_id: Option<String>,
    /// Request path
    pub endpoint: String,
    /// HTTP method
    pub http_method: String,
    /// Request payload snapshot, truncated to [`MAX_PAYLOAD_CHARS`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Response payload snapshot, truncated to [`MAX_PAYLOAD_CHARS`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Response status code
    pub http_status: u16,
    /// Authenticated account id, when a caller identity was established
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Authenticated portfolio, when a caller identity was established
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<String>,
    /// Client IP (first X-Forwarded-For hop or X-Real-IP; "unknown" without either)
    pub client_ip: String,
    /// User-Agent header, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Wall time spent handling the request
    pub request_duration_ms: u64,
    /// Whether the exchange ended with a 4xx/5xx status
    pub is_error: bool,
    /// Error detail for failed exchanges, truncated to [`MAX_ERROR_MESSAGE_CHARS`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Acting account id, or "public" for unauthenticated exchanges
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Truncate a payload snapshot to [`MAX_PAYLOAD_CHARS`] characters, appending
/// [`TRUNCATION_MARKER`] when anything was cut.
///
/// Counting is per character so multi-byte input is never split.
pub fn truncate_payload(value: &str) -> String {
    truncate_with_marker(value, MAX_PAYLOAD_CHARS)
}

/// Truncate an error message to [`MAX_ERROR_MESSAGE_CHARS`] characters.
pub fn truncate_error_message(value: &str) -> String {
    value.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
}

fn truncate_with_marker(value: &str, max_chars: usize) -> String {
    // nth(max) present means at least max + 1 characters
    if value.chars().nth(max_chars).is_none() {
        return value.to_string();
    }

    let mut truncated: String = value.chars().take(max_chars).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
