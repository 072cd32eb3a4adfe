//! Storage abstractions for credentials, vendor transactions, and audit entries.
//!
//! The pipeline only ever talks to these traits. The in-memory implementations
//! in [`memory`] back the default binary and the test suite; a real deployment
//! substitutes database-backed implementations without touching the pipeline.
//!
//! # Failure Semantics
//!
//! Every method returns `Result<_, StorageError>`. Guards translate
//! `StorageError` into 503 responses; the audit writer logs and counts
//! persistence failures without retrying.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AuditEntry, Credential, Transaction};

pub mod memory;

pub use memory::{InMemoryAuditStore, InMemoryCredentialStore, InMemoryTransactionStore};

/// Errors surfaced by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend unreachable or refusing work.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Read/write access to caller credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find the active credential holding this API key.
    async fn find_active_by_key(&self, api_key: &str) -> Result<Option<Credential>, StorageError>;

    /// Find the active credential for a portfolio.
    ///
    /// The admin guard resolves the shared admin key through the reserved
    /// "Admin" portfolio.
    async fn find_active_by_portfolio(
        &self,
        portfolio: &str,
    ) -> Result<Option<Credential>, StorageError>;

    /// Find a credential by business account id, active or not.
    async fn find_by_account_id(
        &self,
        account_id: &str,
    ) -> Result<Option<Credential>, StorageError>;

    /// Check whether any credential holds this API key, active or not.
    async fn exists_by_key(&self, api_key: &str) -> Result<bool, StorageError>;

    /// Insert or replace a credential by record id.
    async fn save(&self, credential: Credential) -> Result<Credential, StorageError>;
}

/// Read/write access to vendor correlation records.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert or replace a transaction by vendor KID.
    async fn save(&self, transaction: Transaction) -> Result<Transaction, StorageError>;

    /// Find a transaction by vendor KID.
    async fn find_by_kid(&self, kid: &str) -> Result<Option<Transaction>, StorageError>;

    /// Check whether a transaction exists for this vendor KID.
    async fn exists_by_kid(&self, kid: &str) -> Result<bool, StorageError>;
}

/// Append-only audit trail.
///
/// The pipeline only writes; inspection happens out of band (or through the
/// in-memory implementation's accessors in tests).
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist one audit entry.
    async fn save(&self, entry: AuditEntry) -> Result<(), StorageError>;
}
