//! CLI interface for Groundwork
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines the full pipeline command, the per-component probes, and the
//! memory and configuration inspectors.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Groundwork retrieval control plane
///
/// Decides whether a question needs external evidence, retrieves from a local
/// corpus, judges the evidence, and answers, hedges, or refuses.
#[derive(Parser, Debug)]
#[command(name = "groundwork")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer a question through the full pipeline
    Ask {
        /// The question to answer
        question: String,

        /// Chunks to retrieve (default: retrieval.top_k)
        #[arg(short, long)]
        k: Option<usize>,

        /// Skip forgetting, retrieval forcing, and write filtering
        #[arg(long)]
        no_policies: bool,

        /// Also write the run trace to this file
        #[arg(long, value_name = "PATH")]
        trace_out: Option<PathBuf>,
    },

    /// Show the retrieval-necessity decision for a question
    Classify {
        /// The question to classify
        question: String,
    },

    /// Show the plan the planner would build
    Plan {
        /// The question to plan for
        question: String,

        /// Chunks to retrieve (default: retrieval.top_k)
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Execute a plan read from a JSON file
    Execute {
        /// Plan file
        plan: PathBuf,
    },

    /// Rank a JSONL candidate file with the configured weights
    Rank {
        /// Candidate rows, one JSON object per line
        candidates: PathBuf,
    },

    /// Assess stored candidates and show the generation decision
    Assess {
        /// Question the candidates were retrieved for
        question: String,

        /// Candidate chunks, one JSON object per line
        candidates: PathBuf,

        /// Executor decision to assess under (retrieve, noop)
        #[arg(long, default_value = "retrieve")]
        decision: String,
    },

    /// Show recent episodic records
    History {
        /// Number of records to show (default: memory.episodic_tail)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Inspect semantic memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Semantic memory actions
#[derive(Subcommand, Debug)]
pub enum MemoryAction {
    /// Read one semantic key
    Get {
        /// Key to read (e.g. last_user_question)
        key: String,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}
