//! Error types and handling
//!
//! This module provides the error types used throughout the Groundwork engine.
//! All errors implement the `ErrorExt` trait which provides user-friendly
//! hints, a taxonomy category, and whether the error is recoverable.
//!
//! # Taxonomy
//!
//! - **Configuration**: unknown plan actions, malformed step arguments, invalid
//!   config files. Fatal for the run and surfaced to the caller unmodified.
//! - **Data**: missing candidate fields, unreadable persisted stores. Stores
//!   degrade to empty results instead of raising these.
//! - **Collaborator**: failures reported by the injected retriever or
//!   language model. Single attempt, never retried here.
//! - **Storage**: I/O and serialization failures, including audit log appends.
//!
//! Policy vetoes are not errors: policy gates return `false`.

use thiserror::Error;

/// Trait for Groundwork error extensions
///
/// Provides additional context for errors, including user-friendly hints and
/// recoverability information. All engine errors implement this trait.
pub trait ErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried by the caller once the underlying
    /// problem is fixed. Configuration errors are not.
    fn is_recoverable(&self) -> bool;

    /// Returns the taxonomy category of the error
    fn category(&self) -> ErrorCategory;
}

/// Broad error category used for reporting and exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Data,
    Collaborator,
    Storage,
}

/// Main engine error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ErrorCategory, ErrorExt};
///
/// let error = EngineError::UnknownAction("summarize".to_string());
/// assert_eq!(error.category(), ErrorCategory::Configuration);
/// assert!(!error.is_recoverable());
///
/// let error = EngineError::Retrieval("index offline".to_string());
/// assert!(error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Step {step_id} args must be a mapping: {reason}")]
    InvalidArgs { step_id: u32, reason: String },

    // Data errors
    #[error("Missing field: {0}")]
    MissingField(String),

    // Collaborator errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Generation error: {0}")]
    Generation(String),

    // Storage errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::UnknownAction(_) => "The plan names an action this engine does not support",
            Self::InvalidArgs { .. } => "Plan step arguments must be a JSON object",
            Self::MissingField(_) => "A candidate or record is missing a required field",
            Self::Retrieval(_) => "Retrieval backend failed. Check the corpus directory",
            Self::Generation(_) => "Language model call failed. Check the llm settings",
            Self::Serialization(_) => "Failed to encode or decode JSON data",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self.category(), ErrorCategory::Configuration)
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::UnknownAction(_) | Self::InvalidArgs { .. } => {
                ErrorCategory::Configuration
            }
            Self::MissingField(_) => ErrorCategory::Data,
            Self::Retrieval(_) | Self::Generation(_) => ErrorCategory::Collaborator,
            Self::Serialization(_) | Self::Io(_) => ErrorCategory::Storage,
        }
    }
}
