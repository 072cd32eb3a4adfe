//! Shared application state for Axum handlers.
//!
//! This module provides thread-safe, clonable state that is shared across
//! all request handlers and the middleware chain. It includes:
//!
//! - **Stores**: Credential, transaction, and audit storage behind traits
//! - **Services**: Token issuance and account provisioning
//! - **Vendor**: The face-compare client seam
//! - **Audit writer**: Bounded-queue handle for async audit persistence
//!
//! # Thread Safety
//!
//! All state components are wrapped in `Arc` or are cheap handles over
//! `Arc`-backed internals, safe for concurrent access from handlers.
//!
//! # Structured Concurrency
//!
//! The audit writer task is managed with `tokio_util::task::TaskTracker`
//! and `CancellationToken`. Call `shutdown()` to stop it and drain the
//! remaining audit backlog before application exit.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use crate::config::Config;
use crate::error::AppResult;
use crate::middleware::admin_auth::ADMIN_PORTFOLIO;
use crate::models::Credential;
use crate::services::{AccountService, AuditWriter, TokenService};
use crate::storage::{
    AuditStore, CredentialStore, InMemoryAuditStore, InMemoryCredentialStore,
    InMemoryTransactionStore, TransactionStore,
};
use crate::token::TokenCodec;
use crate::vendor::{CompareClient, SandboxCompare};

/// Account id assigned to the seeded administrative credential.
const ADMIN_ACCOUNT_ID: &str = "000000000";

/// Shared application state for Axum handlers.
///
/// This struct is cloned for each request handler. All internal data
/// is `Arc`-backed for efficient sharing.
///
/// # Lifecycle
///
/// The audit writer task is spawned when the state is created. Call
/// `shutdown()` before dropping to drain the audit queue:
///
/// ```rust,ignore
/// let state = AppState::new(config).await?;
/// // ... serve ...
/// state.shutdown().await;  // Drain the audit backlog
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Caller credentials, shared with the auth guards
    pub credentials: Arc<dyn CredentialStore>,
    /// Vendor correlation records, upserted by webhook callbacks
    pub transactions: Arc<dyn TransactionStore>,
    /// Token issuance service
    pub tokens: TokenService,
    /// Account provisioning service
    pub accounts: AccountService,
    /// Vendor face-compare client
    pub compare: Arc<dyn CompareClient>,
    /// Queue handle for async audit persistence
    pub audit_writer: AuditWriter,
    /// Token codec, shared with the caller guard
    pub codec: TokenCodec,
    /// Application configuration
    pub config: Arc<Config>,
    /// Tracks the audit writer task for graceful shutdown
    task_tracker: TaskTracker,
    /// Cancellation token signaling background tasks to stop
    cancellation_token: CancellationToken,
}

impl AppState {
    /// Create state backed by fresh in-memory stores.
    ///
    /// When `ADMIN_API_KEY` is configured, the administrative credential is
    /// seeded into the store so the admin guard can resolve it; without it
    /// every admin request is rejected.
    pub async fn new(config: Config) -> AppResult<Self> {
        let credentials = Arc::new(InMemoryCredentialStore::new());

        if let Some(admin_key) = &config.admin_api_key {
            credentials
                .save(Credential::new(
                    admin_key.clone(),
                    ADMIN_ACCOUNT_ID,
                    ADMIN_PORTFOLIO,
                    "system",
                ))
                .await?;
            info!("Administrative credential seeded from configuration");
        }

        Ok(Self::with_stores(
            config,
            credentials,
            Arc::new(InMemoryTransactionStore::new()),
            Arc::new(InMemoryAuditStore::new()),
        ))
    }

    /// Create state over the given stores.
    ///
    /// Spawns the audit writer task; tests hand in pre-seeded or failing
    /// store implementations through this constructor.
    pub fn with_stores(
        config: Config,
        credentials: Arc<dyn CredentialStore>,
        transactions: Arc<dyn TransactionStore>,
        audit: Arc<dyn AuditStore>,
    ) -> Self {
        let config = Arc::new(config);
        let task_tracker = TaskTracker::new();
        let cancellation_token = CancellationToken::new();

        let codec = TokenCodec::new(&config.jwt_secret, config.token_ttl);
        let tokens = TokenService::new(credentials.clone(), codec.clone());
        let accounts = AccountService::new(credentials.clone());
        let compare: Arc<dyn CompareClient> = Arc::new(SandboxCompare::new());

        let audit_writer = AuditWriter::spawn(
            audit,
            config.audit_queue_capacity,
            &task_tracker,
            cancellation_token.clone(),
        );

        Self {
            credentials,
            transactions,
            tokens,
            accounts,
            compare,
            audit_writer,
            codec,
            config,
            task_tracker,
            cancellation_token,
        }
    }

    /// Gracefully shutdown all background tasks.
    ///
    /// This method:
    /// 1. Signals the audit writer to stop via cancellation token
    /// 2. Closes the task tracker (prevents new tasks)
    /// 3. Waits for the writer to drain its backlog and exit
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");

        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("All background tasks have completed");
    }
}
