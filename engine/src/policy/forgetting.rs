//! Forgetting policy
//!
//! Truncates the episodic view handed to the runtime. The log itself is
//! never pruned.

/// Default number of episodic records kept in view
pub const DEFAULT_MAX_RECORDS: usize = 50;

/// Keep the newest `max_records` records, oldest first
pub fn apply<T: Clone>(records: &[T], max_records: usize) -> Vec<T> {
    let start = records.len().saturating_sub(max_records);
    records[start..].to_vec()
}
