//! Memory audit events
//!
//! Every access through the memory router appends one `MemoryEvent` to a
//! JSONL audit log. The engine never reads the log back.

use chrono::Utc;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Episodic,
    Semantic,
}

/// One audited memory access
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEvent {
    /// Unix seconds with sub-second precision
    pub ts_utc: f64,
    pub event_type: EventType,
    pub store: StoreKind,
    pub key: String,
    pub payload: serde_json::Value,
}

impl MemoryEvent {
    /// Create an event stamped with the current time
    pub fn now(
        event_type: EventType,
        store: StoreKind,
        key: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            ts_utc: Utc::now().timestamp_micros() as f64 / 1_000_000.0,
            event_type,
            store,
            key: key.into(),
            payload,
        }
    }
}

/// Append-only JSONL audit log
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a single line
    pub fn append(&self, event: &MemoryEvent) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        tracing::debug!(
            event_type = ?event.event_type,
            store = ?event.store,
            key = %event.key,
            "Memory event"
        );
        Ok(())
    }
}
