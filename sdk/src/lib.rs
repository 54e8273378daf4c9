//! Groundwork SDK
//!
//! Shared contract crate for the Groundwork control plane. Retrieval and
//! generation backends depend on this crate only.

/// Retriever and language model traits
pub mod collaborators;

/// Error types and handling
pub mod errors;

/// Candidate chunk and retrieval output types
pub mod types;

// Re-export commonly used types
pub use collaborators::{LanguageModel, PromptFn, Retriever};
pub use errors::{EngineError, ErrorCategory, ErrorExt};
pub use types::{RetrievalOutput, RetrievedChunk, Score};
