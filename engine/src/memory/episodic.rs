//! Episodic store
//!
//! Append-only JSONL log with one record per run. Reads tail the last N
//! non-blank lines and skip anything that fails to parse.

use sdk::errors::EngineError;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct EpisodicStore {
    path: PathBuf,
}

impl EpisodicStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record as one line with a single write call
    pub fn append(&self, record: &Value) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Last `n` parseable records, oldest first.
    ///
    /// A missing or unreadable log reads as empty. Malformed lines inside the
    /// window are skipped, so fewer than `n` records may come back.
    pub fn tail(&self, n: usize) -> Vec<Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Episodic log {} unreadable: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        let lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let start = lines.len().saturating_sub(n);

        lines[start..]
            .iter()
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed episodic line: {}", e);
                    None
                }
            })
            .collect()
    }
}
