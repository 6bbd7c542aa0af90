//! Storage traits and error types
//!
//! This module defines the persistence interface the orchestration core writes
//! through, and its error type.

use crate::auth::OwnerId;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Append-only sink for scan results and audit records
///
/// Callers treat writes as fire-and-forget: a failed write is logged, never
/// surfaced to the request or job that produced it. Nothing in the core reads
/// back through this interface.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Stores the outcome of a scan on behalf of `owner`
    ///
    /// # Arguments
    ///
    /// * `owner` - The account the scan ran for
    /// * `kind` - Scan kind (e.g., `web_scrape_aggregate`)
    /// * `payload` - The scan result as JSON
    async fn record_scan_event(
        &self,
        owner: &OwnerId,
        kind: &str,
        payload: &Value,
    ) -> StorageResult<()>;

    /// Stores an audit record
    ///
    /// `owner` is None for events not tied to a known account (e.g., a failed login
    /// for an unknown email).
    async fn record_audit_event(
        &self,
        kind: &str,
        owner: Option<&OwnerId>,
        details: &Value,
    ) -> StorageResult<()>;

    /// Whether the sink can currently accept writes; reported by readiness checks
    async fn is_available(&self) -> bool {
        true
    }
}
