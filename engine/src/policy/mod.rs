//! Policies
//!
//! The generation policy gates text generation on evidence. The memory
//! policies (forgetting, retrieval forcing, semantic write filtering) veto by
//! returning values, never by raising errors.

pub mod forgetting;
pub mod generation;
pub mod retrieval;
pub mod write_filter;

pub use generation::{Decision, GenerationDecision, GenerationPolicy, HedgeCode, RefusalCode};
