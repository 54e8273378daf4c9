//! Built-in tools
//!
//! The retrieve action is served by an injected `sdk::Retriever`; this module
//! provides the local corpus implementation used by the CLI.

pub mod corpus;

pub use corpus::{ChunkingStrategy, Corpus, CorpusCache, CorpusKey, CorpusRetriever, CorpusSettings};
