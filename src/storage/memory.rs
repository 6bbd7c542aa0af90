use crate::auth::OwnerId;
use crate::storage::traits::{EventSink, StorageResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Mutex, PoisonError};

/// A recorded event held in memory
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryEvent {
    Scan {
        owner: OwnerId,
        kind: String,
        payload: Value,
    },
    Audit {
        kind: String,
        owner: Option<OwnerId>,
        details: Value,
    },
}

impl MemoryEvent {
    pub fn kind(&self) -> &str {
        match self {
            Self::Scan { kind, .. } | Self::Audit { kind, .. } => kind,
        }
    }
}

/// In-process `EventSink`, used when no database is wanted and in tests
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: Mutex<Vec<MemoryEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in the order they were recorded
    pub fn events(&self) -> Vec<MemoryEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Kinds of all audit events, in order
    pub fn audit_kinds(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                MemoryEvent::Audit { kind, .. } => Some(kind),
                MemoryEvent::Scan { .. } => None,
            })
            .collect()
    }

    fn push(&self, event: MemoryEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[async_trait]
impl EventSink for MemoryEventStore {
    async fn record_scan_event(
        &self,
        owner: &OwnerId,
        kind: &str,
        payload: &Value,
    ) -> StorageResult<()> {
        self.push(MemoryEvent::Scan {
            owner: owner.clone(),
            kind: kind.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }

    async fn record_audit_event(
        &self,
        kind: &str,
        owner: Option<&OwnerId>,
        details: &Value,
    ) -> StorageResult<()> {
        self.push(MemoryEvent::Audit {
            kind: kind.to_string(),
            owner: owner.cloned(),
            details: details.clone(),
        });
        Ok(())
    }
}
