//! SQLite storage implementation
//!
//! This module provides a SQLite-backed `EventSink`. rusqlite is synchronous, so
//! each write runs on the blocking pool while holding the connection mutex.

use crate::auth::OwnerId;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{EventSink, StorageError, StorageResult};
use crate::storage::{AuditRecord, ScanRecord};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// SQLite event store
#[derive(Clone)]
pub struct SqliteEventStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEventStore {
    /// Opens (or creates) the event database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteEventStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&conn)
        })
        .await
        .map_err(|e| StorageError::Database(format!("storage task failed: {}", e)))?
    }

    /// Returns true if the database answers a trivial query
    pub async fn ping(&self) -> bool {
        self.with_conn(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?))
            .await
            .is_ok()
    }

    /// Most recent audit events, newest first
    pub async fn recent_audit_events(&self, limit: usize) -> StorageResult<Vec<AuditRecord>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, kind, owner, details, created_at FROM audit_events
                 ORDER BY id DESC LIMIT ?1",
            )?;

            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (id, kind, owner, details, created_at) = row?;
                records.push(AuditRecord {
                    id,
                    kind,
                    owner: owner.map(OwnerId::new),
                    details: serde_json::from_str(&details)?,
                    created_at,
                });
            }
            Ok(records)
        })
        .await
    }

    /// Most recent scan events for `owner`, newest first
    pub async fn recent_scan_events(
        &self,
        owner: &OwnerId,
        limit: usize,
    ) -> StorageResult<Vec<ScanRecord>> {
        let owner = owner.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, kind, payload, created_at FROM scan_events
                 WHERE owner = ?1 ORDER BY id DESC LIMIT ?2",
            )?;

            let rows = stmt.query_map(params![owner.as_str(), limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (id, kind, payload, created_at) = row?;
                records.push(ScanRecord {
                    id,
                    owner: owner.clone(),
                    kind,
                    payload: serde_json::from_str(&payload)?,
                    created_at,
                });
            }
            Ok(records)
        })
        .await
    }
}

#[async_trait]
impl EventSink for SqliteEventStore {
    async fn is_available(&self) -> bool {
        self.ping().await
    }

    async fn record_scan_event(
        &self,
        owner: &OwnerId,
        kind: &str,
        payload: &Value,
    ) -> StorageResult<()> {
        let owner = owner.as_str().to_string();
        let kind = kind.to_string();
        let payload = serde_json::to_string(payload)?;
        let now = Utc::now().to_rfc3339();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO scan_events (owner, kind, payload, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![owner, kind, payload, now],
            )?;
            Ok(())
        })
        .await
    }

    async fn record_audit_event(
        &self,
        kind: &str,
        owner: Option<&OwnerId>,
        details: &Value,
    ) -> StorageResult<()> {
        let owner = owner.map(|o| o.as_str().to_string());
        let kind = kind.to_string();
        let details = serde_json::to_string(details)?;
        let now = Utc::now().to_rfc3339();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO audit_events (kind, owner, details, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![kind, owner, details, now],
            )?;
            Ok(())
        })
        .await
    }
}
