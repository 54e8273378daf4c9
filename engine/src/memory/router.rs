//! Memory Router
//!
//! The only component allowed to touch persisted memory. Each call performs
//! one store operation and appends exactly one audit event, whatever the
//! outcome. An audit append failure is returned as the call's error.

use crate::memory::episodic::EpisodicStore;
use crate::memory::events::{AuditLog, EventType, MemoryEvent, StoreKind};
use crate::memory::semantic::SemanticStore;
use sdk::errors::EngineError;
use serde_json::{json, Value};
use std::path::Path;

/// Keys listed in an episodic write event
const MAX_LOGGED_KEYS: usize = 25;

pub const EPISODIC_FILE: &str = "episodic.jsonl";
pub const SEMANTIC_FILE: &str = "semantic.json";
pub const EVENTS_FILE: &str = "events.jsonl";

#[derive(Debug)]
pub struct MemoryRouter {
    episodic: EpisodicStore,
    semantic: SemanticStore,
    audit: AuditLog,
}

impl MemoryRouter {
    pub fn new(episodic: EpisodicStore, semantic: SemanticStore, audit: AuditLog) -> Self {
        Self {
            episodic,
            semantic,
            audit,
        }
    }

    /// Router over the standard file layout inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(
            EpisodicStore::new(dir.join(EPISODIC_FILE)),
            SemanticStore::new(dir.join(SEMANTIC_FILE)),
            AuditLog::new(dir.join(EVENTS_FILE)),
        )
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Read one semantic key
    pub fn read_semantic(&self, key: &str) -> Result<Option<Value>, EngineError> {
        let value = self.semantic.get(key);
        self.audit.append(&MemoryEvent::now(
            EventType::Read,
            StoreKind::Semantic,
            key,
            json!({ "found": value.is_some() }),
        ))?;
        Ok(value)
    }

    /// Read the last `n` episodic records
    pub fn read_recent_episodic(&self, n: usize) -> Result<Vec<Value>, EngineError> {
        let rows = self.episodic.tail(n);
        self.audit.append(&MemoryEvent::now(
            EventType::Read,
            StoreKind::Episodic,
            format!("tail:{}", n),
            json!({ "returned": rows.len() }),
        ))?;
        Ok(rows)
    }

    /// Append one episodic record
    pub fn write_episodic(&self, record: &Value) -> Result<(), EngineError> {
        let result = self.episodic.append(record);

        let mut keys: Vec<&str> = record
            .as_object()
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default();
        keys.sort_unstable();
        keys.truncate(MAX_LOGGED_KEYS);

        let payload = with_outcome(json!({ "keys": keys }), &result);
        self.audit.append(&MemoryEvent::now(
            EventType::Write,
            StoreKind::Episodic,
            "append",
            payload,
        ))?;
        result
    }

    /// Set one semantic key
    pub fn write_semantic(&self, key: &str, value: Value) -> Result<(), EngineError> {
        let type_name = json_type_name(&value);
        let result = self.semantic.set(key, value);

        let payload = with_outcome(json!({ "type": type_name }), &result);
        self.audit.append(&MemoryEvent::now(
            EventType::Write,
            StoreKind::Semantic,
            key,
            payload,
        ))?;
        result
    }
}

fn with_outcome(mut payload: Value, result: &Result<(), EngineError>) -> Value {
    if let (Err(e), Some(map)) = (result, payload.as_object_mut()) {
        map.insert("error".to_string(), Value::String(e.to_string()));
    }
    payload
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn events(router: &MemoryRouter) -> Vec<MemoryEvent> {
        fs::read_to_string(router.audit_log().path())
            .unwrap_or_default()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_read_semantic_logs_found_flag() {
        let dir = TempDir::new().unwrap();
        let router = MemoryRouter::in_dir(dir.path());

        assert_eq!(router.read_semantic("last_user_question").unwrap(), None);
        router.write_semantic("last_user_question", json!("q")).unwrap();
        assert_eq!(
            router.read_semantic("last_user_question").unwrap(),
            Some(json!("q"))
        );

        let evs = events(&router);
        assert_eq!(evs.len(), 3);
        assert_eq!(evs[0].payload, json!({"found": false}));
        assert_eq!(evs[1].event_type, EventType::Write);
        assert_eq!(evs[1].payload, json!({"type": "string"}));
        assert_eq!(evs[2].payload, json!({"found": true}));
    }

    #[test]
    fn test_episodic_events() {
        let dir = TempDir::new().unwrap();
        let router = MemoryRouter::in_dir(dir.path());

        router
            .write_episodic(&json!({"question": "q", "used_retrieval": true, "answer": "a"}))
            .unwrap();
        let rows = router.read_recent_episodic(10).unwrap();
        assert_eq!(rows.len(), 1);

        let evs = events(&router);
        assert_eq!(evs[0].key, "append");
        assert_eq!(
            evs[0].payload,
            json!({"keys": ["answer", "question", "used_retrieval"]})
        );
        assert_eq!(evs[1].key, "tail:10");
        assert_eq!(evs[1].payload, json!({"returned": 1}));
    }

    #[test]
    fn test_episodic_keys_are_capped() {
        let dir = TempDir::new().unwrap();
        let router = MemoryRouter::in_dir(dir.path());

        let record: serde_json::Map<String, Value> =
            (0..40).map(|i| (format!("k{:02}", i), json!(i))).collect();
        router.write_episodic(&Value::Object(record)).unwrap();

        let evs = events(&router);
        let keys = evs[0].payload["keys"].as_array().unwrap();
        assert_eq!(keys.len(), 25);
        assert_eq!(keys[0], "k00");
    }

    #[test]
    fn test_failed_write_is_still_audited() {
        let dir = TempDir::new().unwrap();
        // Occupy the semantic path with a directory so the rewrite fails
        fs::create_dir_all(dir.path().join(SEMANTIC_FILE)).unwrap();
        let router = MemoryRouter::in_dir(dir.path());

        assert!(router.write_semantic("k", json!(1)).is_err());
        let evs = events(&router);
        assert_eq!(evs.len(), 1);
        assert!(evs[0].payload.get("error").is_some());
    }
}
