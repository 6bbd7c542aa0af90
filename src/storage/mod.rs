//! Storage module for persisting scan results and audit records
//!
//! This module handles the append-only event log the orchestration core writes to:
//! - The `EventSink` trait the core depends on
//! - A SQLite-backed implementation
//! - An in-memory implementation

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::{MemoryEvent, MemoryEventStore};
pub use sqlite::SqliteEventStore;
pub use traits::{EventSink, StorageError, StorageResult};

use crate::auth::OwnerId;
use serde_json::Value;
use std::path::Path;

/// Audit event kinds written by the core
pub mod audit {
    pub const JOB_QUEUED: &str = "scrape.job_queued";
    pub const JOB_COMPLETED: &str = "scrape.job_completed";
    pub const JOB_FAILED: &str = "scrape.job_failed";
    pub const SYNC_RUN: &str = "scrape.sync_run";
    pub const SCHEDULE_CREATED: &str = "crawler.schedule_created";
    pub const SCHEDULE_DELETED: &str = "crawler.schedule_deleted";
    pub const LOGIN_FAILED: &str = "auth.login_failed";
    pub const LOGIN_SUCCESS: &str = "auth.login_success";
}

/// Scan kind stored for every completed crawl
pub const SCAN_KIND_WEB_SCRAPE: &str = "web_scrape_aggregate";

/// Opens the event database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_event_store(path: &Path) -> StorageResult<SqliteEventStore> {
    SqliteEventStore::new(path)
}

/// Writes an audit event, logging instead of returning a failure
pub async fn record_audit(
    sink: &dyn EventSink,
    kind: &str,
    owner: Option<&OwnerId>,
    details: Value,
) {
    if let Err(e) = sink.record_audit_event(kind, owner, &details).await {
        tracing::error!("Failed to record audit event {}: {}", kind, e);
    }
}

/// Writes a scan event, logging instead of returning a failure
pub async fn record_scan(sink: &dyn EventSink, owner: &OwnerId, kind: &str, payload: Value) {
    if let Err(e) = sink.record_scan_event(owner, kind, &payload).await {
        tracing::error!("Failed to record {} scan for {}: {}", kind, owner, e);
    }
}

/// Represents a row of `audit_events`
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub id: i64,
    pub kind: String,
    pub owner: Option<OwnerId>,
    pub details: Value,
    pub created_at: String,
}

/// Represents a row of `scan_events`
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub id: i64,
    pub owner: OwnerId,
    pub kind: String,
    pub payload: Value,
    pub created_at: String,
}
