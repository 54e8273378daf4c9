//! Working Memory for a single run
//!
//! Short-lived scratch state shared by the planner and executor: the current
//! goal, ordered thoughts, a transient cache of tool outputs, and boolean
//! flags. It is never persisted on its own; the runtime only embeds a
//! snapshot of it in the run trace.

use serde::Serialize;
use std::collections::BTreeMap;

/// Flag set when a retrieve step has executed in this run
pub const USED_RETRIEVAL: &str = "used_retrieval";

/// Per-run scratch state
#[derive(Debug, Clone, Default)]
pub struct WorkingMemory {
    /// Current objective, usually the question
    goal: Option<String>,

    /// Human-readable trace lines, in order
    thoughts: Vec<String>,

    /// Temporary tool outputs
    cache: BTreeMap<String, serde_json::Value>,

    /// Signals for the current run
    flags: BTreeMap<String, bool>,
}

/// Serializable view of working memory embedded in run traces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkingSnapshot {
    pub goal: Option<String>,
    pub thoughts: Vec<String>,
    pub flags: BTreeMap<String, bool>,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create working memory for a run with the given goal
    pub fn with_goal(goal: impl Into<String>) -> Self {
        Self {
            goal: Some(goal.into()),
            ..Self::default()
        }
    }

    pub fn goal(&self) -> Option<&str> {
        self.goal.as_deref()
    }

    pub fn set_goal(&mut self, goal: impl Into<String>) {
        self.goal = Some(goal.into());
    }

    /// Append a trace line
    pub fn think(&mut self, thought: impl Into<String>) {
        self.thoughts.push(thought.into());
    }

    pub fn thoughts(&self) -> &[String] {
        &self.thoughts
    }

    pub fn set_flag(&mut self, name: &str, value: bool) {
        self.flags.insert(name.to_string(), value);
    }

    /// Flag value; unset flags read as false
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Store temporary data for this run
    pub fn remember(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.cache.insert(key.into(), value);
    }

    /// Retrieve temporary data if present
    pub fn recall(&self, key: &str) -> Option<&serde_json::Value> {
        self.cache.get(key)
    }

    /// Clear all working state
    pub fn reset(&mut self) {
        self.goal = None;
        self.thoughts.clear();
        self.cache.clear();
        self.flags.clear();
    }

    /// Snapshot of goal, thoughts, and flags. The cache is left out.
    pub fn snapshot(&self) -> WorkingSnapshot {
        WorkingSnapshot {
            goal: self.goal.clone(),
            thoughts: self.thoughts.clone(),
            flags: self.flags.clone(),
        }
    }
}
