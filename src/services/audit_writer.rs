//! Bounded background writer for the audit trail.
//!
//! The request path never waits on audit persistence. The audit middleware
//! hands finished entries to [`AuditWriter::enqueue`], which pushes onto a
//! bounded channel and returns immediately; a single background task drains
//! the channel into the [`AuditStore`]. A full channel drops the entry,
//! with the drop logged and counted.
//!
//! The writer participates in graceful shutdown through the application's
//! `TaskTracker` and `CancellationToken`: on cancellation it stops accepting
//! new entries and persists whatever is already queued before exiting.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use crate::metrics::{
    record_audit_entry, record_audit_entry_dropped, record_audit_persist_failure,
    set_audit_queue_depth,
};
use crate::models::AuditEntry;
use crate::storage::AuditStore;

/// Cloneable enqueue handle for the audit writer task.
#[derive(Clone)]
pub struct AuditWriter {
    sender: mpsc::Sender<AuditEntry>,
}

impl AuditWriter {
    /// Spawn the writer task on `tracker` and return the enqueue handle.
    ///
    /// The task drains entries into `store` until `shutdown` fires, then
    /// persists the remaining backlog and exits.
    pub fn spawn(
        store: Arc<dyn AuditStore>,
        capacity: usize,
        tracker: &TaskTracker,
        shutdown: CancellationToken,
    ) -> Self {
        let (writer, receiver) = Self::channel(capacity);
        tracker.spawn(drain(store, receiver, shutdown));
        writer
    }

    /// Build the handle and its receiving end without spawning the task.
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<AuditEntry>) {
        // mpsc::channel panics on zero capacity
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Queue one entry for persistence without waiting.
    ///
    /// When the queue is full or the writer has stopped, the entry is
    /// dropped, logged, and counted; the caller is never blocked.
    pub fn enqueue(&self, entry: AuditEntry) {
        match self.sender.try_send(entry) {
            Ok(()) => {
                record_audit_entry();
                set_audit_queue_depth(self.queue_depth());
            }
            Err(TrySendError::Full(entry)) => {
                record_audit_entry_dropped();
                warn!(
                    endpoint = %entry.endpoint,
                    http_status = entry.http_status,
                    "Audit queue full, dropping entry"
                );
            }
            Err(TrySendError::Closed(entry)) => {
                record_audit_entry_dropped();
                warn!(
                    endpoint = %entry.endpoint,
                    http_status = entry.http_status,
                    "Audit writer stopped, dropping entry"
                );
            }
        }
    }

    /// Whether the writer task is still accepting entries.
    ///
    /// Drives the readiness probe: once the writer stops, new audit entries
    /// would be silently dropped, so the instance reports not-ready.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Entries currently queued and not yet persisted.
    pub fn queue_depth(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }
}

/// Writer task body: persist entries until shutdown, then drain the backlog.
async fn drain(
    store: Arc<dyn AuditStore>,
    mut receiver: mpsc::Receiver<AuditEntry>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased; // Check cancellation first

            _ = shutdown.cancelled() => {
                debug!("Audit writer received cancellation signal");
                break;
            }
            entry = receiver.recv() => {
                match entry {
                    Some(entry) => persist(store.as_ref(), entry).await,
                    None => {
                        debug!("Audit channel closed, writer exiting");
                        return;
                    }
                }
            }
        }
    }

    // Persist whatever was queued before the shutdown signal.
    receiver.close();
    while let Some(entry) = receiver.recv().await {
        persist(store.as_ref(), entry).await;
    }

    debug!("Audit writer shut down");
}

/// Persist one entry, counting failures instead of propagating them.
async fn persist(store: &dyn AuditStore, entry: AuditEntry) {
    let endpoint = entry.endpoint.clone();
    let http_status = entry.http_status;

    if let Err(err) = store.save(entry).await {
        record_audit_persist_failure();
        error!(endpoint = %endpoint, error = %err, "Failed to persist audit entry");
    } else {
        debug!(endpoint = %endpoint, http_status, "Audit entry persisted");
    }
}
