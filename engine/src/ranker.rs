//! Candidate Ranker
//!
//! Reorders candidates that carry heterogeneous retrieval scores using a
//! weighted blend of normalised dense/sparse scores and cheap lexical
//! features. Ranking is pure: the same input always yields the same output.

use crate::text::{content_tokens, key_fraction, key_terms, token_set, DEFAULT_KEY_TERMS};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Chunks shorter than this many characters are penalised
const MIN_CHARS: usize = 200;

/// Pattern hits beyond this count add nothing
const MAX_PATTERN_HITS: usize = 4;

static DEFINITIONAL_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn definitional_patterns() -> &'static [Regex] {
    DEFINITIONAL_PATTERNS.get_or_init(|| {
        [
            r"\b(is|are)\s+defined\s+as\b",
            r"\bmeans\b",
            r"\brefers\s+to\b",
            r"\bbecause\b",
            r"\btherefore\b",
            r"\bstep\s+\d+\b",
            r"\bmust\b",
            r"\bshould\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("Invalid definitional pattern"))
        .collect()
    })
}

/// Feature weights for the blended score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankWeights {
    /// Normalised dense score
    pub wd: f64,
    /// Normalised sparse score
    pub wb: f64,
    /// Query/chunk token overlap
    pub wo: f64,
    /// Key-phrase presence
    pub wk: f64,
    /// Definitional/causal patterns
    pub wp: f64,
    /// Short-chunk penalty (subtracted)
    pub wl: f64,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            wd: 0.4,
            wb: 0.3,
            wo: 0.1,
            wk: 0.1,
            wp: 0.0,
            wl: 0.1,
        }
    }
}

/// One row of the candidate frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankCandidate {
    /// Grouping key; rows are normalised and ranked per question
    #[serde(deserialize_with = "string_or_number")]
    pub question_id: String,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub chunk_id: u64,
    #[serde(default, alias = "doc_id")]
    pub source: String,
    #[serde(default, alias = "text")]
    pub chunk_text: String,
    #[serde(default)]
    pub dense_score: Option<f64>,
    #[serde(default, alias = "bm25_score")]
    pub sparse_score: Option<f64>,
}

/// A candidate with its computed features and rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    #[serde(flatten)]
    pub candidate: RankCandidate,
    pub norm_dense: f64,
    pub norm_sparse: f64,
    pub overlap: f64,
    pub keyphrase: f64,
    pub pattern: f64,
    pub len_penalty: f64,
    #[serde(rename = "S")]
    pub score: f64,
    /// 1-based rank within the candidate's question group
    pub rerank_rank: usize,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Float(f) => f.to_string(),
    })
}

/// Min-max normalise optional values.
///
/// All-missing or all-equal inputs normalise to zero; a missing value inside
/// a non-degenerate group also normalises to zero.
pub fn minmax(values: &[Option<f64>]) -> Vec<f64> {
    let present: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| !v.is_nan())
        .collect();
    if present.is_empty() {
        return vec![0.0; values.len()];
    }

    let mn = present.iter().copied().fold(f64::INFINITY, f64::min);
    let mx = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if mn == mx {
        return vec![0.0; values.len()];
    }

    values
        .iter()
        .map(|v| match v {
            Some(x) if !x.is_nan() => (x - mn) / (mx - mn + 1e-12),
            _ => 0.0,
        })
        .collect()
}

/// Jaccard similarity of the stopword-filtered token sets
pub fn overlap_score(chunk_text: &str, query_text: &str) -> f64 {
    let c: HashSet<String> = content_tokens(chunk_text).into_iter().collect();
    let q: HashSet<String> = content_tokens(query_text).into_iter().collect();
    if c.is_empty() || q.is_empty() {
        return 0.0;
    }
    let inter = c.intersection(&q).count();
    let union = c.union(&q).count().max(1);
    inter as f64 / union as f64
}

/// Fraction of the query's key terms present in the chunk
pub fn keyphrase_score(chunk_text: &str, query_text: &str, top_n: usize) -> f64 {
    let keys = key_terms(query_text, top_n);
    key_fraction(&keys, &token_set(chunk_text))
}

/// Definitional/causal cue density, capped at four hits
pub fn pattern_score(text: &str) -> f64 {
    let lowered = text.to_lowercase();
    let hits = definitional_patterns()
        .iter()
        .filter(|p| p.is_match(&lowered))
        .count();
    hits.min(MAX_PATTERN_HITS) as f64 / MAX_PATTERN_HITS as f64
}

/// Linear penalty for chunks under the minimum length
pub fn length_penalty(text: &str) -> f64 {
    let n = text.chars().count();
    if n >= MIN_CHARS {
        return 0.0;
    }
    (MIN_CHARS - n) as f64 / MIN_CHARS as f64
}

/// Order question ids numerically when both parse as numbers, else
/// lexically. Numeric ids sort before non-numeric ones.
pub fn compare_question_ids(a: &str, b: &str) -> Ordering {
    let numeric = |s: &str| s.trim().parse::<f64>().ok().filter(|v| v.is_finite());
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Rank candidates.
///
/// Output is ordered by `question_id` ascending (see
/// [`compare_question_ids`]), then blended score descending. Ties keep their input order, so ranking an already ranked
/// list with the same weights reproduces the same ranks.
pub fn rank(candidates: &[RankCandidate], weights: &RankWeights) -> Vec<RankedCandidate> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
    for (idx, c) in candidates.iter().enumerate() {
        let id = c.question_id.as_str();
        let slot = *slots.entry(id).or_insert_with(|| {
            groups.push((id, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(idx);
    }
    groups.sort_by(|a, b| compare_question_ids(a.0, b.0));

    let mut ranked = Vec::with_capacity(candidates.len());
    for (question_id, members) in groups {
        let dense: Vec<Option<f64>> = members.iter().map(|&i| candidates[i].dense_score).collect();
        let sparse: Vec<Option<f64>> = members.iter().map(|&i| candidates[i].sparse_score).collect();
        let norm_dense = minmax(&dense);
        let norm_sparse = minmax(&sparse);

        let mut group: Vec<RankedCandidate> = members
            .iter()
            .enumerate()
            .map(|(pos, &i)| {
                let c = &candidates[i];
                let overlap = overlap_score(&c.chunk_text, &c.question_text);
                let keyphrase = keyphrase_score(&c.chunk_text, &c.question_text, DEFAULT_KEY_TERMS);
                let pattern = pattern_score(&c.chunk_text);
                let len_penalty = length_penalty(&c.chunk_text);
                let score = weights.wd * norm_dense[pos]
                    + weights.wb * norm_sparse[pos]
                    + weights.wo * overlap
                    + weights.wk * keyphrase
                    + weights.wp * pattern
                    - weights.wl * len_penalty;

                RankedCandidate {
                    candidate: c.clone(),
                    norm_dense: norm_dense[pos],
                    norm_sparse: norm_sparse[pos],
                    overlap,
                    keyphrase,
                    pattern,
                    len_penalty,
                    score,
                    rerank_rank: 0,
                }
            })
            .collect();

        // sort_by is stable
        group.sort_by(|a, b| b.score.total_cmp(&a.score));
        for (pos, r) in group.iter_mut().enumerate() {
            r.rerank_rank = pos + 1;
        }

        tracing::debug!(question_id, candidates = group.len(), "Ranked question group");
        ranked.extend(group);
    }

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(qid: &str, chunk_id: u64, text: &str, dense: Option<f64>, sparse: Option<f64>) -> RankCandidate {
        RankCandidate {
            question_id: qid.to_string(),
            question_text: "How is attention defined in the transformer?".to_string(),
            chunk_id,
            source: "paper.pdf".to_string(),
            chunk_text: text.to_string(),
            dense_score: dense,
            sparse_score: sparse,
        }
    }

    #[test]
    fn test_minmax_degenerate_groups() {
        assert_eq!(minmax(&[None, None]), vec![0.0, 0.0]);
        assert_eq!(minmax(&[Some(0.4), Some(0.4)]), vec![0.0, 0.0]);
        assert!(minmax(&[]).is_empty());
    }

    #[test]
    fn test_minmax_missing_value_in_group() {
        let out = minmax(&[Some(1.0), None, Some(3.0)]);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.0);
        assert!((out[2] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_overlap_score() {
        assert_eq!(overlap_score("", "attention"), 0.0);
        // {attention, scales} vs {attention} -> 1/2
        assert_eq!(overlap_score("attention scales", "the attention"), 0.5);
    }

    #[test]
    fn test_pattern_score_caps_at_four() {
        assert_eq!(pattern_score("nothing here"), 0.0);
        assert_eq!(pattern_score("It means this because of that"), 0.5);
        let text = "X is defined as Y. It means Z because W, therefore you must and should follow step 2.";
        assert_eq!(pattern_score(text), 1.0);
    }

    #[test]
    fn test_length_penalty() {
        assert_eq!(length_penalty(&"a".repeat(200)), 0.0);
        assert_eq!(length_penalty(&"a".repeat(50)), 0.75);
        assert_eq!(length_penalty(""), 1.0);
    }

    #[test]
    fn test_rank_orders_by_question_then_score() {
        let candidates = vec![
            cand("2", 1, "unrelated", Some(0.9), Some(3.0)),
            cand("1", 2, "low", Some(0.1), Some(1.0)),
            cand("1", 3, "high", Some(0.8), Some(9.0)),
            cand("2", 4, "lower", Some(0.2), Some(1.0)),
        ];
        let ranked = rank(&candidates, &RankWeights::default());
        let order: Vec<(String, u64, usize)> = ranked
            .iter()
            .map(|r| (r.candidate.question_id.clone(), r.candidate.chunk_id, r.rerank_rank))
            .collect();
        assert_eq!(
            order,
            vec![
                ("1".to_string(), 3, 1),
                ("1".to_string(), 2, 2),
                ("2".to_string(), 1, 1),
                ("2".to_string(), 4, 2),
            ]
        );
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let candidates = vec![
            cand("1", 7, "same", Some(0.5), None),
            cand("1", 3, "same", Some(0.5), None),
        ];
        let ranked = rank(&candidates, &RankWeights::default());
        assert_eq!(ranked[0].candidate.chunk_id, 7);
        assert_eq!(ranked[1].candidate.chunk_id, 3);
    }

    #[test]
    fn test_rerank_is_idempotent() {
        let candidates = vec![
            cand("1", 1, "attention is defined as a weighted sum", Some(0.3), Some(2.0)),
            cand("1", 2, "the transformer uses attention", Some(0.7), None),
            cand("1", 3, "unrelated text", None, Some(8.0)),
        ];
        let weights = RankWeights::default();
        let first = rank(&candidates, &weights);
        let again: Vec<RankCandidate> = first.iter().map(|r| r.candidate.clone()).collect();
        let second = rank(&again, &weights);

        let ids = |rs: &[RankedCandidate]| -> Vec<(u64, usize)> {
            rs.iter().map(|r| (r.candidate.chunk_id, r.rerank_rank)).collect()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_numeric_question_ids_order_by_value() {
        let rows = vec![
            cand("10", 1, "attention", Some(0.5), None),
            cand("9", 2, "attention", Some(0.5), None),
            cand("2", 3, "attention", Some(0.5), None),
            cand("q7", 4, "attention", Some(0.5), None),
        ];
        let ranked = rank(&rows, &RankWeights::default());
        let order: Vec<&str> = ranked.iter().map(|r| r.candidate.question_id.as_str()).collect();
        assert_eq!(order, vec!["2", "9", "10", "q7"]);
    }

    #[test]
    fn test_compare_question_ids() {
        assert_eq!(compare_question_ids("2", "10"), Ordering::Less);
        assert_eq!(compare_question_ids("1.5", "1"), Ordering::Greater);
        assert_eq!(compare_question_ids("b", "a"), Ordering::Greater);
        assert_eq!(compare_question_ids("3", "a"), Ordering::Less);
    }

    #[test]
    fn test_candidate_accepts_numeric_question_id() {
        let row = r#"{"question_id": 12, "question_text": "q", "chunk_text": "t", "dense_score": 0.5}"#;
        let c: RankCandidate = serde_json::from_str(row).unwrap();
        assert_eq!(c.question_id, "12");
        assert_eq!(c.sparse_score, None);
    }

    #[test]
    fn test_ranked_row_serializes_flat() {
        let ranked = rank(&[cand("1", 1, "text", Some(0.5), None)], &RankWeights::default());
        let value = serde_json::to_value(&ranked[0]).unwrap();
        assert_eq!(value["question_id"], "1");
        assert_eq!(value["rerank_rank"], 1);
        assert!(value.get("S").is_some());
    }
}
