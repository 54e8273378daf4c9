//! Configuration management
//!
//! This module handles loading, validation, and management of the Groundwork
//! configuration. Configuration is stored in TOML format at
//! ~/.groundwork/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **retrieval**: Corpus location, chunking, candidate pool, reranking
//! - **ranker**: Candidate ranker feature weights
//! - **evidence**: Evidence assessor thresholds
//! - **memory**: Episodic tail size, forgetting, semantic write limits
//! - **llm**: Language model backend
//!
//! Every section is optional in the file; missing keys take their defaults.
//!
//! # Path Expansion
//!
//! `~` in `core.data_dir` and `retrieval.corpus_dir` is expanded to the
//! user's home directory, and the data directory is created if missing.
//!
//! # Examples
//!
//! ```no_run
//! use groundwork_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Corpus: {:?}", config.retrieval.corpus_dir);
//! println!("Provider: {}", config.llm.provider);
//! # Ok(())
//! # }
//! ```

use crate::evidence::EvidenceThresholds;
use crate::ranker::RankWeights;
use crate::tools::corpus::{ChunkingStrategy, CorpusSettings};
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Subdirectory of the data directory holding the memory stores
const MEMORY_DIR: &str = "memory";

/// Run trace log inside the data directory
const TRACES_FILE: &str = "traces.jsonl";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Local corpus retrieval
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Candidate ranker weights
    #[serde(default)]
    pub ranker: RankWeights,

    /// Evidence assessor thresholds
    #[serde(default)]
    pub evidence: EvidenceConfig,

    /// Memory stores and policies
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Language model backend
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

/// Local corpus retrieval configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Directory of .txt / .md documents (supports ~ expansion)
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,

    /// Chunks handed to the pipeline per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Chunking strategy (fixed, paragraph)
    #[serde(default = "default_chunking")]
    pub chunking: ChunkingStrategy,

    /// Maximum characters per chunk
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,

    /// Maximum chunks indexed per corpus
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,

    /// Pass the candidate pool through the ranker
    #[serde(default)]
    pub rerank: bool,

    /// Candidate pool is `max(top_k * pool_multiplier, min_pool)`
    #[serde(default = "default_pool_multiplier")]
    pub pool_multiplier: usize,

    #[serde(default = "default_min_pool")]
    pub min_pool: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            corpus_dir: default_corpus_dir(),
            top_k: default_top_k(),
            chunking: default_chunking(),
            chunk_chars: default_chunk_chars(),
            max_chunks: default_max_chunks(),
            rerank: false,
            pool_multiplier: default_pool_multiplier(),
            min_pool: default_min_pool(),
        }
    }
}

/// Evidence assessor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceConfig {
    /// Similarity floor for evidence to count as present (0.0-1.0)
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,

    /// Minimum key-term coverage for a sufficient verdict (0.0-1.0)
    #[serde(default = "default_coverage_threshold")]
    pub coverage_threshold: f64,

    /// Score above which distinct sources count as conflicting (0.0-1.0)
    #[serde(default = "default_conflict_threshold")]
    pub conflict_threshold: f64,

    /// Query key terms considered for coverage
    #[serde(default = "default_key_terms")]
    pub key_terms: usize,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            min_similarity: default_min_similarity(),
            coverage_threshold: default_coverage_threshold(),
            conflict_threshold: default_conflict_threshold(),
            key_terms: default_key_terms(),
        }
    }
}

/// Memory configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Episodic records read before each run
    #[serde(default = "default_episodic_tail")]
    pub episodic_tail: usize,

    /// Records kept in view by the forgetting policy
    #[serde(default = "default_forgetting_max_records")]
    pub forgetting_max_records: usize,

    /// Longest string value the semantic write filter accepts
    #[serde(default = "default_max_semantic_value_chars")]
    pub max_semantic_value_chars: usize,

    /// Apply forgetting, retrieval forcing, and write filtering
    #[serde(default = "default_true")]
    pub enforce_policies: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            episodic_tail: default_episodic_tail(),
            forgetting_max_records: default_forgetting_max_records(),
            max_semantic_value_chars: default_max_semantic_value_chars(),
            enforce_policies: true,
        }
    }
}

/// Language model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend (echo, ollama)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Ollama backend settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            ollama: OllamaConfig::default(),
        }
    }
}

/// Ollama backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.groundwork")
}

fn default_corpus_dir() -> PathBuf {
    PathBuf::from("~/.groundwork/corpus")
}

fn default_top_k() -> usize {
    4
}

fn default_chunking() -> ChunkingStrategy {
    ChunkingStrategy::Fixed
}

fn default_chunk_chars() -> usize {
    800
}

fn default_max_chunks() -> usize {
    1000
}

fn default_pool_multiplier() -> usize {
    5
}

fn default_min_pool() -> usize {
    20
}

fn default_min_similarity() -> f64 {
    0.5
}

fn default_coverage_threshold() -> f64 {
    0.5
}

fn default_conflict_threshold() -> f64 {
    0.8
}

fn default_key_terms() -> usize {
    6
}

fn default_episodic_tail() -> usize {
    10
}

fn default_forgetting_max_records() -> usize {
    50
}

fn default_max_semantic_value_chars() -> usize {
    500
}

fn default_provider() -> String {
    "echo".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

impl Config {
    /// Load configuration from the default location (~/.groundwork/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;
        Self::load_or_create_at(&config_path)
    }

    /// Load the configuration at `path`, writing defaults there if it is missing
    pub fn load_or_create_at(path: &Path) -> Result<Self, EngineError> {
        if path.exists() {
            Self::load_from_path(path)
        } else {
            Self::create_default(path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(&Config::default())
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = Config::default();
        config.validate_and_process()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.groundwork/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".groundwork").join("config.toml"))
    }

    /// Check value ranges without touching the filesystem
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["echo", "ollama"];
        if !valid_providers.contains(&self.llm.provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid provider '{}'. Must be one of: {}",
                self.llm.provider,
                valid_providers.join(", ")
            )));
        }

        let thresholds = [
            ("min_similarity", self.evidence.min_similarity),
            ("coverage_threshold", self.evidence.coverage_threshold),
            ("conflict_threshold", self.evidence.conflict_threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::Config(format!(
                    "{} must be between 0.0 and 1.0",
                    name
                )));
            }
        }

        if self.retrieval.top_k == 0 {
            return Err(EngineError::Config("top_k must be at least 1".to_string()));
        }
        if self.retrieval.chunk_chars == 0 {
            return Err(EngineError::Config(
                "chunk_chars must be at least 1".to_string(),
            ));
        }
        if self.evidence.key_terms == 0 {
            return Err(EngineError::Config(
                "key_terms must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate, expand `~` in paths, and create the data directory
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        self.validate()?;

        self.core.data_dir = expand_path(&self.core.data_dir)?;
        self.retrieval.corpus_dir = expand_path(&self.retrieval.corpus_dir)?;

        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                EngineError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        Ok(())
    }

    /// Directory holding the episodic, semantic, and audit logs
    pub fn memory_dir(&self) -> PathBuf {
        self.core.data_dir.join(MEMORY_DIR)
    }

    /// Append-only run trace log
    pub fn traces_path(&self) -> PathBuf {
        self.core.data_dir.join(TRACES_FILE)
    }

    pub fn evidence_thresholds(&self) -> EvidenceThresholds {
        EvidenceThresholds {
            min_similarity: self.evidence.min_similarity,
            coverage: self.evidence.coverage_threshold,
            conflict: self.evidence.conflict_threshold,
            key_terms: self.evidence.key_terms,
        }
    }

    pub fn corpus_settings(&self) -> CorpusSettings {
        CorpusSettings {
            dir: self.retrieval.corpus_dir.clone(),
            strategy: self.retrieval.chunking,
            chunk_chars: self.retrieval.chunk_chars,
            max_chunks: self.retrieval.max_chunks,
            rerank: self.retrieval.rerank,
            pool_multiplier: self.retrieval.pool_multiplier,
            min_pool: self.retrieval.min_pool,
            weights: self.ranker,
        }
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.provider, "echo");
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.retrieval.chunking, ChunkingStrategy::Fixed);
        assert_eq!(config.evidence.min_similarity, 0.5);
        assert_eq!(config.evidence.conflict_threshold, 0.8);
        assert_eq!(config.memory.episodic_tail, 10);
        assert!(config.memory.enforce_policies);
        assert_eq!(config.ranker, RankWeights::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_expand_path_tilde_only() {
        let path = PathBuf::from("~");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let config: Config = toml::from_str(
            r#"
            [evidence]
            min_similarity = 0.6

            [ranker]
            wp = 0.2
            "#,
        )
        .unwrap();

        assert_eq!(config.evidence.min_similarity, 0.6);
        assert_eq!(config.evidence.coverage_threshold, 0.5);
        assert_eq!(config.ranker.wp, 0.2);
        assert_eq!(config.ranker.wd, 0.4);
        assert_eq!(config.llm.provider, "echo");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.core.log_level = "verbose".to_string();
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));

        let mut config = Config::default();
        config.llm.provider = "openai".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.evidence.conflict_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.evidence.key_terms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_chunking_strategy_fails_to_parse() {
        let parsed: Result<Config, _> = toml::from_str("[retrieval]\nchunking = \"semantic\"\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_evidence_thresholds_mapping() {
        let mut config = Config::default();
        config.evidence.coverage_threshold = 0.7;
        let t = config.evidence_thresholds();
        assert_eq!(t.coverage, 0.7);
        assert_eq!(t.key_terms, 6);
    }
}
