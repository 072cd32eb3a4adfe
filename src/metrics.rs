//! Prometheus metrics for application observability.
//!
//! This module provides Prometheus-compatible metrics for monitoring the
//! request pipeline. Metrics are exposed via a dedicated HTTP endpoint
//! (default port: 9090).
//!
//! # Available Metrics
//!
//! ## Counters
//! - `fm_auth_failures_total` - Rejected requests (with label: guard)
//! - `fm_tokens_issued_total` - Caller tokens issued
//! - `fm_audit_entries_total` - Audit entries queued for persistence
//! - `fm_audit_entries_dropped_total` - Audit entries dropped on a full queue
//! - `fm_audit_persist_failures_total` - Audit entries that failed to persist
//!
//! ## Histograms
//! - `fm_request_duration_seconds` - Request duration (with labels: endpoint, method, status)
//!
//! ## Gauges
//! - `fm_audit_queue_depth` - Entries currently waiting in the audit queue
//!
//! # Usage
//!
//! ```rust,ignore
//! use fm_gateway::metrics::{init_metrics, record_auth_failure};
//!
//! // Initialize metrics (call once at startup)
//! init_metrics(addr)?;
//!
//! // Record metrics where events happen
//! record_auth_failure("caller");
//! ```

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const AUTH_FAILURES_TOTAL: &str = "fm_auth_failures_total";
    pub const TOKENS_ISSUED_TOTAL: &str = "fm_tokens_issued_total";
    pub const AUDIT_ENTRIES_TOTAL: &str = "fm_audit_entries_total";
    pub const AUDIT_ENTRIES_DROPPED_TOTAL: &str = "fm_audit_entries_dropped_total";
    pub const AUDIT_PERSIST_FAILURES_TOTAL: &str = "fm_audit_persist_failures_total";
    pub const REQUEST_DURATION_SECONDS: &str = "fm_request_duration_seconds";
    pub const AUDIT_QUEUE_DEPTH: &str = "fm_audit_queue_depth";
}

/// Initialize the Prometheus metrics exporter.
///
/// This sets up metric descriptions and starts the Prometheus HTTP listener
/// on the specified address (default: 0.0.0.0:9090).
///
/// # Arguments
///
/// * `metrics_addr` - Address for the Prometheus metrics endpoint
///
/// # Returns
///
/// `Ok(())` if initialization succeeds, `Err` with message otherwise.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    // Set up Prometheus exporter
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    // Describe all metrics
    describe_counter!(
        names::AUTH_FAILURES_TOTAL,
        "Total number of requests rejected by an authentication guard"
    );
    describe_counter!(
        names::TOKENS_ISSUED_TOTAL,
        "Total number of caller tokens issued"
    );
    describe_counter!(
        names::AUDIT_ENTRIES_TOTAL,
        "Total number of audit entries queued for persistence"
    );
    describe_counter!(
        names::AUDIT_ENTRIES_DROPPED_TOTAL,
        "Total number of audit entries dropped because the queue was full"
    );
    describe_counter!(
        names::AUDIT_PERSIST_FAILURES_TOTAL,
        "Total number of audit entries that failed to persist"
    );

    describe_histogram!(
        names::REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );

    describe_gauge!(
        names::AUDIT_QUEUE_DEPTH,
        "Audit entries currently waiting in the bounded queue"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
///
/// This is useful for cases where metrics are optional.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

// =============================================================================
// Counter Recording Functions
// =============================================================================

/// Record a request rejected by a guard ("admin" or "caller").
pub fn record_auth_failure(guard: &str) {
    counter!(names::AUTH_FAILURES_TOTAL, "guard" => guard.to_string()).increment(1);
}

/// Record an issued caller token.
pub fn record_token_issued() {
    counter!(names::TOKENS_ISSUED_TOTAL).increment(1);
}

/// Record an audit entry handed to the writer queue.
pub fn record_audit_entry() {
    counter!(names::AUDIT_ENTRIES_TOTAL).increment(1);
}

/// Record an audit entry dropped on a full queue.
pub fn record_audit_entry_dropped() {
    counter!(names::AUDIT_ENTRIES_DROPPED_TOTAL).increment(1);
}

/// Record an audit entry the writer failed to persist.
pub fn record_audit_persist_failure() {
    counter!(names::AUDIT_PERSIST_FAILURES_TOTAL).increment(1);
}

// =============================================================================
// Histogram Recording Functions
// =============================================================================

/// Record HTTP request duration.
pub fn record_request_duration(endpoint: &str, method: &str, status: &str, duration_secs: f64) {
    histogram!(names::REQUEST_DURATION_SECONDS, "endpoint" => endpoint.to_string(), "method" => method.to_string(), "status" => status.to_string())
        .record(duration_secs);
}

// =============================================================================
// Gauge Recording Functions
// =============================================================================

/// Update the audit queue depth gauge.
pub fn set_audit_queue_depth(depth: usize) {
    gauge!(names::AUDIT_QUEUE_DEPTH).set(depth as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests verify the functions don't panic.
    // Full metrics testing requires integration tests with a Prometheus scraper.

    #[test]
    fn test_record_auth_failure() {
        // Should not panic even without metrics initialized
        record_auth_failure("admin");
        record_auth_failure("caller");
    }

    #[test]
    fn test_record_counters() {
        record_token_issued();
        record_audit_entry();
        record_audit_entry_dropped();
        record_audit_persist_failure();
    }

    #[test]
    fn test_record_request_duration() {
        record_request_duration("/api/v1/generate-token", "POST", "200", 0.1);
    }

    #[test]
    fn test_set_audit_queue_depth() {
        set_audit_queue_depth(0);
        set_audit_queue_depth(1024);
    }
}
