//! Retrieval-forcing policy
//!
//! If the previous run retrieved, force retrieval again. This deliberately
//! over-constrains the planner.

use crate::memory::working::{WorkingMemory, USED_RETRIEVAL};
use serde_json::Value;

/// Advise on retrieval for the next plan.
///
/// Returns `Some(true)` to force retrieval, `None` to stay out of the way.
/// The policy never blocks retrieval. Only the episodic tail is consulted;
/// `_working_memory` is reserved for run-local signals.
pub fn advise(_working_memory: &WorkingMemory, episodic_tail: &[Value]) -> Option<bool> {
    let last = episodic_tail.last()?;
    if last.get(USED_RETRIEVAL).and_then(Value::as_bool) == Some(true) {
        tracing::debug!("Previous run used retrieval; forcing retrieval");
        return Some(true);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_tail_does_not_interfere() {
        assert_eq!(advise(&WorkingMemory::new(), &[]), None);
    }

    #[test]
    fn test_last_record_with_retrieval_forces() {
        let tail = vec![json!({"used_retrieval": false}), json!({"used_retrieval": true})];
        assert_eq!(advise(&WorkingMemory::new(), &tail), Some(true));
    }

    #[test]
    fn test_only_last_record_counts() {
        let tail = vec![json!({"used_retrieval": true}), json!({"used_retrieval": false})];
        assert_eq!(advise(&WorkingMemory::new(), &tail), None);
    }

    #[test]
    fn test_working_memory_flags_do_not_force() {
        let mut wm = WorkingMemory::new();
        wm.set_flag(USED_RETRIEVAL, true);
        assert_eq!(advise(&wm, &[]), None);
        assert_eq!(advise(&wm, &[json!({"used_retrieval": false})]), None);
    }

    #[test]
    fn test_truthy_non_bool_is_ignored() {
        let tail = vec![json!({"used_retrieval": 1})];
        assert_eq!(advise(&WorkingMemory::new(), &tail), None);
    }
}
