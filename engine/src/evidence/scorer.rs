//! Evidence Scorer
//!
//! Turns a candidate set plus a query into comparable quality signals:
//! similarity, key-term coverage, and source conflict. All functions are pure.

use crate::text::{key_fraction, key_terms, tokenize};
use sdk::types::RetrievedChunk;
use std::collections::{BTreeSet, HashSet};

/// Maximum comparable score across candidates; 0.0 for an empty set
pub fn max_similarity(chunks: &[RetrievedChunk]) -> f64 {
    chunks
        .iter()
        .map(|c| c.score.comparable())
        .reduce(f64::max)
        .unwrap_or(0.0)
}

/// True iff any candidate's comparable score reaches `threshold`
pub fn evidence_present(chunks: &[RetrievedChunk], threshold: f64) -> bool {
    chunks.iter().any(|c| c.score.comparable() >= threshold)
}

/// Fraction of the query's top `top_n` key terms found as a raw token in at
/// least one candidate. 0.0 when the query has no key terms.
pub fn coverage(chunks: &[RetrievedChunk], query: &str, top_n: usize) -> f64 {
    let keys = key_terms(query, top_n);
    if keys.is_empty() {
        return 0.0;
    }

    let tokens: HashSet<String> = chunks.iter().flat_map(|c| tokenize(&c.text)).collect();
    key_fraction(&keys, &tokens)
}

/// Distinct sources that have at least one candidate scoring `threshold` or more
pub fn high_scoring_sources(chunks: &[RetrievedChunk], threshold: f64) -> BTreeSet<&str> {
    chunks
        .iter()
        .filter(|c| c.score.comparable() >= threshold && !c.source.is_empty())
        .map(|c| c.source.as_str())
        .collect()
}

/// Source-diversity conflict proxy.
///
/// True iff two or more distinct sources each contribute a candidate at or
/// above `threshold`. This is not contradiction detection.
pub fn conflicting_sources(chunks: &[RetrievedChunk], threshold: f64) -> bool {
    high_scoring_sources(chunks, threshold).len() > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::types::Score;

    fn chunk(id: u64, source: &str, text: &str, score: f64) -> RetrievedChunk {
        RetrievedChunk::new(id, source, text, Score::Scalar(score))
    }

    #[test]
    fn test_max_similarity() {
        let chunks = vec![chunk(1, "a", "x", 0.3), chunk(2, "a", "y", 0.7)];
        assert_eq!(max_similarity(&chunks), 0.7);
        assert_eq!(max_similarity(&[]), 0.0);
    }

    #[test]
    fn test_max_similarity_uses_provenance_fallback() {
        let chunks = vec![RetrievedChunk::new(
            1,
            "a",
            "x",
            Score::provenance(None, Some(0.66)),
        )];
        assert_eq!(max_similarity(&chunks), 0.66);
    }

    #[test]
    fn test_evidence_present_threshold_is_inclusive() {
        let chunks = vec![chunk(1, "a", "x", 0.5)];
        assert!(evidence_present(&chunks, 0.5));
        assert!(!evidence_present(&chunks, 0.51));
        assert!(!evidence_present(&[], 0.5));
    }

    #[test]
    fn test_coverage_counts_terms_across_chunks() {
        let chunks = vec![
            chunk(1, "a", "The encoder has six layers.", 0.9),
            chunk(2, "a", "Attention heads run in parallel.", 0.8),
        ];
        // key terms: attention, encoder, layers, many
        let cov = coverage(&chunks, "many encoder layers with attention", 6);
        assert_eq!(cov, 0.75);
    }

    #[test]
    fn test_coverage_zero_without_key_terms() {
        let chunks = vec![chunk(1, "a", "anything at all", 0.9)];
        assert_eq!(coverage(&chunks, "is it the", 6), 0.0);
    }

    #[test]
    fn test_conflict_requires_distinct_sources() {
        let same = vec![chunk(1, "a.pdf", "x", 0.9), chunk(2, "a.pdf", "y", 0.85)];
        assert!(!conflicting_sources(&same, 0.8));

        let diverse = vec![chunk(1, "a.pdf", "x", 0.9), chunk(2, "b.pdf", "y", 0.85)];
        assert!(conflicting_sources(&diverse, 0.8));

        let one_low = vec![chunk(1, "a.pdf", "x", 0.9), chunk(2, "b.pdf", "y", 0.79)];
        assert!(!conflicting_sources(&one_low, 0.8));
    }

    #[test]
    fn test_conflict_ignores_unnamed_sources() {
        let chunks = vec![chunk(1, "", "x", 0.95), chunk(2, "a.pdf", "y", 0.9)];
        assert!(!conflicting_sources(&chunks, 0.8));
    }
}
