//! Semantic write filter
//!
//! Only a fixed set of keys may be written to the semantic store, and long
//! string values are rejected.

use serde_json::Value;

pub const LAST_USER_QUESTION: &str = "last_user_question";
pub const LAST_ANSWER_PREVIEW: &str = "last_answer_preview";

const ALLOWED_SEMANTIC_KEYS: &[&str] = &[LAST_USER_QUESTION, LAST_ANSWER_PREVIEW];

/// Default cap on string values, in characters
pub const DEFAULT_MAX_VALUE_CHARS: usize = 500;

/// Returns true if the semantic write is allowed
pub fn allow_semantic_write(key: &str, value: &Value, max_chars: usize) -> bool {
    if !ALLOWED_SEMANTIC_KEYS.contains(&key) {
        tracing::debug!(key, "Semantic write blocked: key not allowed");
        return false;
    }

    if let Value::String(s) = value {
        if s.chars().count() > max_chars {
            tracing::debug!(key, "Semantic write blocked: value too large");
            return false;
        }
    }

    true
}
