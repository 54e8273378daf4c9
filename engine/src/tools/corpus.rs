//! Local corpus retrieval tool
//!
//! A `Retriever` over a directory of `.txt` / `.md` files. Documents are
//! chunked, scored with BM25 (sparse) and a term-frequency cosine (dense
//! proxy), fused by reciprocal rank, and optionally passed through the
//! candidate ranker. Loaded corpora are cached per `CorpusKey`.

use crate::ranker::{self, RankCandidate, RankWeights};
use crate::text::content_tokens;
use async_trait::async_trait;
use sdk::collaborators::Retriever;
use sdk::errors::EngineError;
use sdk::types::{RetrievalOutput, RetrievedChunk, Score};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::fs;
use tracing::{debug, info};

/// BM25 term saturation
const BM25_K1: f64 = 1.2;
/// BM25 length normalisation
const BM25_B: f64 = 0.75;
/// Reciprocal rank fusion constant
const RRF_K: f64 = 60.0;

const CORPUS_EXTENSIONS: &[&str] = &["txt", "md"];

/// How documents are split into chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Character windows cut on word boundaries
    Fixed,
    /// Blank-line separated paragraphs, merged up to the window size
    Paragraph,
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkingStrategy::Fixed => f.write_str("fixed"),
            ChunkingStrategy::Paragraph => f.write_str("paragraph"),
        }
    }
}

impl FromStr for ChunkingStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(ChunkingStrategy::Fixed),
            "paragraph" => Ok(ChunkingStrategy::Paragraph),
            other => Err(EngineError::Config(format!(
                "Unknown chunking strategy: {}",
                other
            ))),
        }
    }
}

/// Split `text` into chunks of at most `chunk_chars` characters.
///
/// Whitespace is collapsed. A single word longer than the window becomes its
/// own chunk.
pub fn chunk_text(text: &str, strategy: ChunkingStrategy, chunk_chars: usize) -> Vec<String> {
    match strategy {
        ChunkingStrategy::Fixed => window_words(text.split_whitespace(), chunk_chars),
        ChunkingStrategy::Paragraph => {
            let mut chunks = Vec::new();
            let mut buf = String::new();

            for para in split_paragraphs(text) {
                let para_len = para.chars().count();
                if para_len > chunk_chars {
                    if !buf.is_empty() {
                        chunks.push(std::mem::take(&mut buf));
                    }
                    chunks.extend(window_words(para.split_whitespace(), chunk_chars));
                    continue;
                }

                if buf.is_empty() {
                    buf = para;
                } else if buf.chars().count() + 1 + para_len <= chunk_chars {
                    buf.push(' ');
                    buf.push_str(&para);
                } else {
                    chunks.push(std::mem::replace(&mut buf, para));
                }
            }

            if !buf.is_empty() {
                chunks.push(buf);
            }
            chunks
        }
    }
}

fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.extend(line.split_whitespace());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }
    paragraphs
}

fn window_words<'a>(words: impl Iterator<Item = &'a str>, chunk_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0;

    for word in words {
        let word_len = word.chars().count();
        if !buf.is_empty() && buf_len + 1 + word_len > chunk_chars {
            chunks.push(std::mem::take(&mut buf));
            buf_len = 0;
        }
        if !buf.is_empty() {
            buf.push(' ');
            buf_len += 1;
        }
        buf.push_str(word);
        buf_len += word_len;
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }
    chunks
}

/// One indexed chunk
#[derive(Debug, Clone)]
pub struct CorpusChunk {
    pub chunk_id: u64,
    pub source: String,
    pub text: String,
    term_freqs: HashMap<String, usize>,
    length: usize,
}

impl CorpusChunk {
    fn new(chunk_id: u64, source: &str, text: String) -> Self {
        let tokens = content_tokens(&text);
        let length = tokens.len();
        let mut term_freqs = HashMap::new();
        for t in tokens {
            *term_freqs.entry(t).or_insert(0) += 1;
        }
        Self {
            chunk_id,
            source: source.to_string(),
            text,
            term_freqs,
            length,
        }
    }
}

/// A scored search hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Index into [`Corpus::chunks`]
    pub index: usize,
    pub dense: f64,
    pub sparse: f64,
}

/// An indexed, immutable set of chunks
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    chunks: Vec<CorpusChunk>,
    doc_freqs: HashMap<String, usize>,
    avg_len: f64,
}

impl Corpus {
    /// Build a corpus from `(source, text)` documents, in order.
    ///
    /// Chunk ids are assigned globally from 0; indexing stops at `max_chunks`.
    pub fn from_documents<S: AsRef<str>, T: AsRef<str>>(
        documents: &[(S, T)],
        strategy: ChunkingStrategy,
        chunk_chars: usize,
        max_chunks: usize,
    ) -> Self {
        let mut chunks = Vec::new();

        'docs: for (source, text) in documents {
            for piece in chunk_text(text.as_ref(), strategy, chunk_chars) {
                if chunks.len() >= max_chunks {
                    break 'docs;
                }
                chunks.push(CorpusChunk::new(chunks.len() as u64, source.as_ref(), piece));
            }
        }

        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        for c in &chunks {
            for term in c.term_freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
        }

        let total_len: usize = chunks.iter().map(|c| c.length).sum();
        let avg_len = if chunks.is_empty() {
            0.0
        } else {
            total_len as f64 / chunks.len() as f64
        };

        Self {
            chunks,
            doc_freqs,
            avg_len,
        }
    }

    /// Load every `.txt` / `.md` file in `dir`, sorted by file name
    pub async fn load(
        dir: &Path,
        strategy: ChunkingStrategy,
        chunk_chars: usize,
        max_chunks: usize,
    ) -> Result<Self, EngineError> {
        let mut entries = fs::read_dir(dir).await.map_err(|e| {
            EngineError::Retrieval(format!("Cannot read corpus {}: {}", dir.display(), e))
        })?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let wanted = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| CORPUS_EXTENSIONS.contains(&e))
                .unwrap_or(false);
            if wanted && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = fs::read_to_string(&path).await?;
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            documents.push((source, text));
        }

        let corpus = Self::from_documents(&documents, strategy, chunk_chars, max_chunks);
        info!(
            "Loaded corpus {} ({} documents, {} chunks)",
            dir.display(),
            documents.len(),
            corpus.len()
        );
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[CorpusChunk] {
        &self.chunks
    }

    fn bm25(&self, chunk: &CorpusChunk, query_terms: &[String]) -> f64 {
        let n = self.chunks.len() as f64;
        let len_norm = if self.avg_len > 0.0 {
            chunk.length as f64 / self.avg_len
        } else {
            0.0
        };

        query_terms
            .iter()
            .filter_map(|term| {
                let tf = *chunk.term_freqs.get(term)? as f64;
                let df = *self.doc_freqs.get(term).unwrap_or(&0) as f64;
                let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
                Some(idf * tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * len_norm)))
            })
            .sum()
    }

    fn cosine(chunk: &CorpusChunk, query_freqs: &HashMap<String, usize>) -> f64 {
        let dot: f64 = query_freqs
            .iter()
            .filter_map(|(t, q)| chunk.term_freqs.get(t).map(|c| (*q * *c) as f64))
            .sum();
        if dot == 0.0 {
            return 0.0;
        }
        let norm = |m: &HashMap<String, usize>| {
            m.values().map(|v| (*v * *v) as f64).sum::<f64>().sqrt()
        };
        dot / (norm(query_freqs) * norm(&chunk.term_freqs))
    }

    /// Hybrid search.
    ///
    /// Chunks sharing at least one content term with the question are ranked
    /// separately by dense and sparse score, fused by reciprocal rank, and
    /// the best `pool` hits returned. Ties keep corpus order.
    pub fn search(&self, question: &str, pool: usize) -> Vec<Hit> {
        let query_tokens = content_tokens(question);
        let mut query_freqs: HashMap<String, usize> = HashMap::new();
        for t in &query_tokens {
            *query_freqs.entry(t.clone()).or_insert(0) += 1;
        }
        let mut query_terms: Vec<String> = query_freqs.keys().cloned().collect();
        query_terms.sort();

        let hits: Vec<Hit> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(index, c)| Hit {
                index,
                dense: Self::cosine(c, &query_freqs),
                sparse: self.bm25(c, &query_terms),
            })
            .filter(|h| h.dense > 0.0)
            .collect();

        let rank_by = |key: fn(&Hit) -> f64| -> HashMap<usize, usize> {
            let mut order: Vec<&Hit> = hits.iter().collect();
            order.sort_by(|a, b| key(b).total_cmp(&key(a)));
            order
                .iter()
                .enumerate()
                .map(|(rank, h)| (h.index, rank + 1))
                .collect()
        };
        let dense_rank = rank_by(|h| h.dense);
        let sparse_rank = rank_by(|h| h.sparse);

        let fused = |h: &Hit| -> f64 {
            1.0 / (RRF_K + dense_rank[&h.index] as f64)
                + 1.0 / (RRF_K + sparse_rank[&h.index] as f64)
        };

        let mut ordered = hits.clone();
        ordered.sort_by(|a, b| fused(b).total_cmp(&fused(a)));
        ordered.truncate(pool);
        ordered
    }
}

/// Structured cache key for a loaded corpus
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorpusKey {
    pub dir: PathBuf,
    pub strategy: ChunkingStrategy,
    pub chunk_chars: usize,
    pub max_chunks: usize,
}

/// Owned cache of loaded corpora with explicit invalidation
#[derive(Debug, Default)]
pub struct CorpusCache {
    entries: Mutex<HashMap<CorpusKey, Arc<Corpus>>>,
}

impl CorpusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CorpusKey) -> Option<Arc<Corpus>> {
        self.entries
            .lock()
            .expect("corpus cache lock poisoned")
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: CorpusKey, corpus: Corpus) -> Arc<Corpus> {
        let corpus = Arc::new(corpus);
        self.entries
            .lock()
            .expect("corpus cache lock poisoned")
            .insert(key, Arc::clone(&corpus));
        corpus
    }

    /// Return the cached corpus for `key`, loading it on a miss
    pub async fn get_or_load(&self, key: &CorpusKey) -> Result<Arc<Corpus>, EngineError> {
        if let Some(corpus) = self.get(key) {
            debug!("Corpus cache hit for {}", key.dir.display());
            return Ok(corpus);
        }

        let corpus = Corpus::load(&key.dir, key.strategy, key.chunk_chars, key.max_chunks).await?;
        Ok(self.insert(key.clone(), corpus))
    }

    /// Drop one entry; returns true if it was cached
    pub fn invalidate(&self, key: &CorpusKey) -> bool {
        self.entries
            .lock()
            .expect("corpus cache lock poisoned")
            .remove(key)
            .is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().expect("corpus cache lock poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("corpus cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Settings for [`CorpusRetriever`]
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusSettings {
    pub dir: PathBuf,
    pub strategy: ChunkingStrategy,
    pub chunk_chars: usize,
    pub max_chunks: usize,
    pub rerank: bool,
    pub pool_multiplier: usize,
    pub min_pool: usize,
    pub weights: RankWeights,
}

impl CorpusSettings {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            strategy: ChunkingStrategy::Fixed,
            chunk_chars: 800,
            max_chunks: 1000,
            rerank: false,
            pool_multiplier: 5,
            min_pool: 20,
            weights: RankWeights::default(),
        }
    }

    pub fn key(&self) -> CorpusKey {
        CorpusKey {
            dir: self.dir.clone(),
            strategy: self.strategy,
            chunk_chars: self.chunk_chars,
            max_chunks: self.max_chunks,
        }
    }

    /// Candidate pool size for a request of `k` chunks; saturates on huge `k`
    pub fn pool_size(&self, k: usize) -> usize {
        k.saturating_mul(self.pool_multiplier).max(self.min_pool)
    }
}

/// Hybrid retriever over a local text corpus
pub struct CorpusRetriever {
    settings: CorpusSettings,
    cache: Arc<CorpusCache>,
}

impl CorpusRetriever {
    pub fn new(settings: CorpusSettings) -> Self {
        Self::with_cache(settings, Arc::new(CorpusCache::new()))
    }

    /// Share a cache between retrievers
    pub fn with_cache(settings: CorpusSettings, cache: Arc<CorpusCache>) -> Self {
        Self { settings, cache }
    }

    pub fn cache(&self) -> &Arc<CorpusCache> {
        &self.cache
    }

    fn rerank(
        &self,
        question: &str,
        corpus: &Corpus,
        hits: &[Hit],
        k: usize,
    ) -> Vec<RetrievedChunk> {
        let rows: Vec<RankCandidate> = hits
            .iter()
            .map(|h| {
                let c = &corpus.chunks[h.index];
                RankCandidate {
                    question_id: "0".to_string(),
                    question_text: question.to_string(),
                    chunk_id: c.chunk_id,
                    source: c.source.clone(),
                    chunk_text: c.text.clone(),
                    dense_score: Some(h.dense),
                    sparse_score: Some(h.sparse),
                }
            })
            .collect();

        ranker::rank(&rows, &self.settings.weights)
            .into_iter()
            .take(k)
            .map(|r| {
                RetrievedChunk::new(
                    r.candidate.chunk_id,
                    r.candidate.source,
                    r.candidate.chunk_text,
                    Score::Scalar(r.score),
                )
            })
            .collect()
    }
}

#[async_trait]
impl Retriever for CorpusRetriever {
    fn name(&self) -> &str {
        "corpus"
    }

    async fn retrieve(&self, question: &str, k: usize) -> Result<RetrievalOutput, EngineError> {
        let corpus = self
            .cache
            .get_or_load(&self.settings.key())
            .await?;

        let hits = corpus.search(question, self.settings.pool_size(k));
        let candidate_pool_size = hits.len();

        let chunks = if self.settings.rerank {
            self.rerank(question, &corpus, &hits, k)
        } else {
            hits.iter()
                .take(k)
                .map(|h| {
                    let c = &corpus.chunks[h.index];
                    RetrievedChunk::new(
                        c.chunk_id,
                        c.source.clone(),
                        c.text.clone(),
                        Score::provenance(Some(h.dense), Some(h.sparse)),
                    )
                })
                .collect()
        };

        debug!(
            k,
            candidate_pool_size,
            returned = chunks.len(),
            reranked = self.settings.rerank,
            "Corpus retrieval complete"
        );

        Ok(RetrievalOutput {
            k,
            mode: "hybrid".to_string(),
            reranked: self.settings.rerank,
            candidate_pool_size,
            chunks,
        })
    }
}
