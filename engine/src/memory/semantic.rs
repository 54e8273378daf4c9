//! Semantic store
//!
//! A flat key to JSON map persisted as one pretty-printed JSON object. Every
//! `set` is a whole-snapshot read-modify-write. Writes are serialised inside
//! the process; separate processes sharing the file are last-writer-wins.

use sdk::errors::EngineError;
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug)]
pub struct SemanticStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SemanticStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole snapshot. Missing or corrupt files read as empty.
    pub fn load(&self) -> Map<String, Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                warn!("Semantic store {} unreadable: {}", self.path.display(), e);
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!("Semantic store {} is not a JSON object", self.path.display());
                Map::new()
            }
            Err(e) => {
                warn!("Semantic store {} is corrupt: {}", self.path.display(), e);
                Map::new()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.load().remove(key)
    }

    /// Set one key, rewriting the whole file
    pub fn set(&self, key: &str, value: Value) -> Result<(), EngineError> {
        let _guard = self.write_lock.lock().expect("semantic store lock poisoned");

        let mut data = self.load();
        data.insert(key.to_string(), value);
        self.save(&data)
    }

    fn save(&self, data: &Map<String, Value>) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
