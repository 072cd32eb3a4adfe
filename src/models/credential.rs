use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A long-lived caller credential.
///
/// Credentials are provisioned by the admin endpoints and looked up by the
/// caller guard and token issuance. The pair of `api_key` and `account_id`
/// identifies one caller; `portfolio` groups callers for reporting. The
/// reserved portfolio "Admin" holds the administrative key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Unique record identifier
    pub id: Uuid,
    /// 16-character alphanumeric API key (unique across active records)
    pub api_key: String,
    /// 9-character business account identifier
    pub account_id: String,
    /// Portfolio label (1-10 alphanumeric characters)
    pub portfolio: String,
    /// Whether this credential may authenticate
    pub is_active: bool,
    /// Actor that created the record (admin username or "admin")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Actor that last updated the record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    /// Create a new active credential with a fresh record id.
    pub fn new(
        api_key: impl Into<String>,
        account_id: impl Into<String>,
        portfolio: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            api_key: api_key.into(),
            account_id: account_id.into(),
            portfolio: portfolio.into(),
            is_active: true,
            created_by: Some(created_by.into()),
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}
