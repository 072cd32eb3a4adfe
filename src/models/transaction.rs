use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation record for one vendor verification request.
///
/// Upserted by webhook callbacks as the verification progresses. Keyed by
/// `kid`, which is unique per vendor request, so repeated callbacks never
/// create duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique record identifier
    pub id: Uuid,
    /// Vendor-issued request identifier (KID)
    pub kid: String,
    /// Latest verification status reported by the vendor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Vendor reference id from webhook callbacks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    /// Vendor transaction id from webhook callbacks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction for a vendor KID.
    pub fn new(kid: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kid: kid.into(),
            status: None,
            reference_id: None,
            transaction_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction_carries_kid() {
        let transaction = Transaction::new("kid-001");

        assert_eq!(transaction.kid, "kid-001");
        assert!(transaction.status.is_none());
        assert!(transaction.reference_id.is_none());
    }

    #[test]
    fn test_serialization_skips_unset_fields() {
        let transaction = Transaction::new("kid-002");
        let json = serde_json::to_string(&transaction).expect("Serialization should succeed");

        assert!(json.contains("\"kid\":\"kid-002\""));
        assert!(!json.contains("reference_id"));
        assert!(!json.contains("transaction_id"));
    }
}
