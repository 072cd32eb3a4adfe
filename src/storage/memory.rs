//! In-memory storage implementations.
//!
//! These back the default binary and the test suite. All state lives in
//! process memory behind `tokio::sync::RwLock`; nothing survives a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuditStore, CredentialStore, StorageError, TransactionStore};
use crate::models::{AuditEntry, Credential, Transaction};

/// Credential store keyed by record id.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<HashMap<Uuid, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_active_by_key(&self, api_key: &str) -> Result<Option<Credential>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|c| c.is_active && c.api_key == api_key)
            .cloned())
    }

    async fn find_active_by_portfolio(
        &self,
        portfolio: &str,
    ) -> Result<Option<Credential>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|c| c.is_active && c.portfolio == portfolio)
            .cloned())
    }

    async fn find_by_account_id(
        &self,
        account_id: &str,
    ) -> Result<Option<Credential>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|c| c.account_id == account_id)
            .cloned())
    }

    async fn exists_by_key(&self, api_key: &str) -> Result<bool, StorageError> {
        let records = self.records.read().await;
        Ok(records.values().any(|c| c.api_key == api_key))
    }

    async fn save(&self, credential: Credential) -> Result<Credential, StorageError> {
        let mut records = self.records.write().await;
        records.insert(credential.id, credential.clone());
        Ok(credential)
    }
}

/// Transaction store keyed by vendor KID.
#[derive(Debug, Default)]
pub struct InMemoryTransactionStore {
    records: RwLock<HashMap<String, Transaction>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn save(&self, transaction: Transaction) -> Result<Transaction, StorageError> {
        let mut records = self.records.write().await;
        records.insert(transaction.kid.clone(), transaction.clone());
        Ok(transaction)
    }

    async fn find_by_kid(&self, kid: &str) -> Result<Option<Transaction>, StorageError> {
        let records = self.records.read().await;
        Ok(records.get(kid).cloned())
    }

    async fn exists_by_kid(&self, kid: &str) -> Result<bool, StorageError> {
        let records = self.records.read().await;
        Ok(records.contains_key(kid))
    }
}

/// Append-only audit store.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all persisted entries, oldest first.
    pub async fn all(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }

    /// Number of persisted entries.
    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn save(&self, entry: AuditEntry) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        Ok(())
    }
}
