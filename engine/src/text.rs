//! Lexical helpers shared by the candidate ranker and the evidence scorer
//!
//! Tokens are lower-cased ASCII alphanumeric runs. Key terms are the unique
//! stopword-filtered tokens of a query ordered longest first, ties broken
//! lexically, so the selection is deterministic.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Number of query key terms used for coverage and key-phrase features
pub const DEFAULT_KEY_TERMS: usize = 6;

static TOKEN_PATTERN: OnceLock<Regex> = OnceLock::new();

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "if", "then", "else", "for", "to", "of", "in", "on",
    "at", "by", "with", "as", "is", "are", "was", "were", "be", "been", "being", "it", "this",
    "that", "these", "those", "you", "your", "we", "our", "they", "their", "i", "me", "my", "from",
    "into", "over", "under", "after", "before", "during", "about", "between", "within", "without",
    "not", "no", "can", "could", "should", "would", "may", "might", "must", "will", "do", "does",
    "did",
];

fn token_pattern() -> &'static Regex {
    TOKEN_PATTERN.get_or_init(|| Regex::new(r"[a-z0-9]+").expect("Invalid token pattern"))
}

/// Returns true if `token` is in the fixed stopword list
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Split text into lower-cased alphanumeric tokens, in order
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    token_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Tokens with stopwords removed, in order, duplicates kept
pub fn content_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !is_stopword(t))
        .collect()
}

/// Set of all raw tokens in `text`
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Deterministic key terms of a query.
///
/// Unique content tokens sorted longest first with a lexical tie-break,
/// truncated to `top_n`.
pub fn key_terms(query: &str, top_n: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut terms: Vec<String> = content_tokens(query)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect();
    terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    terms.truncate(top_n);
    terms
}

/// Fraction of `keys` that appear in `tokens`; 0.0 when there are no keys
pub fn key_fraction(keys: &[String], tokens: &HashSet<String>) -> f64 {
    if keys.is_empty() {
        return 0.0;
    }
    let hits = keys.iter().filter(|k| tokens.contains(k.as_str())).count();
    hits as f64 / keys.len() as f64
}
