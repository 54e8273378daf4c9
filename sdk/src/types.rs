//! Candidate chunk and retrieval output types
//!
//! These are the shapes the retrieval collaborator hands to the engine. The
//! engine only reads them; it never cares how chunks were produced.

use serde::{Deserialize, Serialize};

/// Similarity score attached to a candidate chunk.
///
/// Reranked retrieval yields a single scalar; hybrid retrieval yields the
/// dense/sparse provenance pair. Serialized untagged so both wire shapes
/// (`0.82` and `{"dense_score": 0.8, "sparse_score": 11.2}`) parse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Scalar(f64),
    Provenance {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dense_score: Option<f64>,
        #[serde(
            default,
            alias = "bm25_score",
            skip_serializing_if = "Option::is_none"
        )]
        sparse_score: Option<f64>,
    },
}

impl Score {
    /// Build a provenance score from optional dense and sparse components
    pub fn provenance(dense: Option<f64>, sparse: Option<f64>) -> Self {
        Self::Provenance {
            dense_score: dense,
            sparse_score: sparse,
        }
    }

    /// Collapse the score into one comparable float.
    ///
    /// Scalar scores are returned as-is. Provenance scores prefer the dense
    /// component, then the sparse one, then 0.0. Non-finite values count as 0.0.
    pub fn comparable(&self) -> f64 {
        let value = match *self {
            Self::Scalar(s) => Some(s),
            Self::Provenance {
                dense_score,
                sparse_score,
            } => dense_score.or(sparse_score),
        };
        value.filter(|v| v.is_finite()).unwrap_or(0.0)
    }

    /// Dense component, if any. A scalar score counts as dense.
    pub fn dense(&self) -> Option<f64> {
        match *self {
            Self::Scalar(s) => Some(s),
            Self::Provenance { dense_score, .. } => dense_score,
        }
    }

    /// Sparse component, if any
    pub fn sparse(&self) -> Option<f64> {
        match *self {
            Self::Scalar(_) => None,
            Self::Provenance { sparse_score, .. } => sparse_score,
        }
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::Scalar(0.0)
    }
}

/// A candidate passage returned by the retrieval collaborator.
///
/// On input the document name is the first non-empty of `source`, `doc_id`
/// and `source_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ChunkRecord")]
pub struct RetrievedChunk {
    pub chunk_id: u64,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub score: Score,

    /// Document the chunk came from
    #[serde(default)]
    pub source: String,
}

/// Wire shape of a chunk as producers emit it
#[derive(Deserialize)]
struct ChunkRecord {
    chunk_id: u64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    score: Score,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    doc_id: Option<String>,
    #[serde(default)]
    source_id: Option<String>,
}

impl From<ChunkRecord> for RetrievedChunk {
    fn from(record: ChunkRecord) -> Self {
        let source = [record.source, record.doc_id, record.source_id]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or_default();

        Self {
            chunk_id: record.chunk_id,
            text: record.text,
            score: record.score,
            source,
        }
    }
}

impl RetrievedChunk {
    /// Create a new chunk
    pub fn new(
        chunk_id: u64,
        source: impl Into<String>,
        text: impl Into<String>,
        score: Score,
    ) -> Self {
        Self {
            chunk_id,
            text: text.into(),
            score,
            source: source.into(),
        }
    }
}

/// Output of a single retrieval call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOutput {
    pub k: usize,
    pub mode: String,
    pub reranked: bool,
    pub candidate_pool_size: usize,
    pub chunks: Vec<RetrievedChunk>,
}

impl RetrievalOutput {
    /// An empty hybrid result
    pub fn empty(k: usize) -> Self {
        Self {
            k,
            mode: "hybrid".to_string(),
            reranked: false,
            candidate_pool_size: 0,
            chunks: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_score_parses_from_number() {
        let score: Score = serde_json::from_value(json!(0.82)).unwrap();
        assert_eq!(score, Score::Scalar(0.82));
        assert_eq!(score.comparable(), 0.82);
    }

    #[test]
    fn test_provenance_prefers_dense() {
        let score: Score =
            serde_json::from_value(json!({"dense_score": 0.61, "sparse_score": 9.5})).unwrap();
        assert_eq!(score.comparable(), 0.61);
        assert_eq!(score.sparse(), Some(9.5));
    }

    #[test]
    fn test_provenance_falls_back_to_sparse() {
        let score: Score = serde_json::from_value(json!({"bm25_score": 3.0})).unwrap();
        assert_eq!(score.comparable(), 3.0);
        assert_eq!(score.dense(), None);
    }

    #[test]
    fn test_empty_provenance_is_zero() {
        let score: Score = serde_json::from_value(json!({})).unwrap();
        assert_eq!(score.comparable(), 0.0);
        assert_eq!(Score::Scalar(f64::NAN).comparable(), 0.0);
    }

    #[test]
    fn test_chunk_accepts_doc_id_alias() {
        let chunk: RetrievedChunk = serde_json::from_value(json!({
            "chunk_id": 7,
            "doc_id": "paper.pdf",
            "text": "attention is all you need",
            "score": 0.9
        }))
        .unwrap();
        assert_eq!(chunk.source, "paper.pdf");
        assert_eq!(chunk.score.comparable(), 0.9);
    }

    #[test]
    fn test_chunk_with_source_and_doc_id_parses() {
        let chunk: RetrievedChunk = serde_json::from_value(json!({
            "chunk_id": 3,
            "source": "report.pdf",
            "doc_id": "doc-17",
            "text": "x",
            "score": 0.7
        }))
        .unwrap();
        assert_eq!(chunk.source, "report.pdf");
    }

    #[test]
    fn test_chunk_source_falls_through_empty_names() {
        let chunk: RetrievedChunk = serde_json::from_value(json!({
            "chunk_id": 4,
            "source": "",
            "source_id": "s-9",
            "text": "x"
        }))
        .unwrap();
        assert_eq!(chunk.source, "s-9");

        let bare: RetrievedChunk =
            serde_json::from_value(json!({"chunk_id": 5, "text": "x"})).unwrap();
        assert_eq!(bare.source, "");
    }

    #[test]
    fn test_chunk_round_trips_through_json() {
        let chunk = RetrievedChunk::new(9, "a.pdf", "body", Score::Scalar(0.5));
        let value = serde_json::to_value(&chunk).unwrap();
        let back: RetrievedChunk = serde_json::from_value(value).unwrap();
        assert_eq!(back, chunk);
    }

    #[test]
    fn test_chunk_missing_score_defaults_to_zero() {
        let chunk: RetrievedChunk =
            serde_json::from_value(json!({"chunk_id": 1, "text": "x", "source": "a"})).unwrap();
        assert_eq!(chunk.score, Score::Scalar(0.0));
    }

    #[test]
    fn test_chunk_missing_id_is_rejected() {
        let result: Result<RetrievedChunk, _> =
            serde_json::from_value(json!({"text": "x", "source": "a"}));
        assert!(result.is_err());
    }
}
