//! Groundwork Engine Library
//!
//! This library provides the control plane of a retrieval-augmented
//! question-answering agent: retrieval-necessity classification, planning,
//! execution, evidence assessment, generation gating, and audited memory.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Classifier, planner, and executor
pub mod conductor;

/// Evidence scoring and sufficiency assessment
pub mod evidence;

/// Policy-gated generation templates
pub mod generator;

/// Language model backends
pub mod llm;

/// Persisted and working memory behind an audited router
pub mod memory;

/// Generation and memory policies
pub mod policy;

/// Weighted candidate ranker
pub mod ranker;

/// Pipeline runtime
pub mod runtime;

/// Telemetry and Observability
pub mod telemetry;

/// Shared text normalisation
pub mod text;

/// Built-in retrieval tools
pub mod tools;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
