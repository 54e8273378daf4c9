//! Retrieval-Necessity Classifier
//!
//! Decides from the question text alone whether answering needs external
//! evidence. Rules are checked in order and the first match wins; matching is
//! case-insensitive.

use crate::conductor::types::{Confidence, RetrievalDecision};
use regex::{Regex, RegexSet};
use std::sync::OnceLock;

static EVIDENCE_PATTERNS: OnceLock<RegexSet> = OnceLock::new();
static PARAMETRIC_HINTS: OnceLock<RegexSet> = OnceLock::new();
static NUMERIC_LITERAL: OnceLock<Regex> = OnceLock::new();
static EMPIRICAL_TERM: OnceLock<Regex> = OnceLock::new();

fn evidence_patterns() -> &'static RegexSet {
    EVIDENCE_PATTERNS.get_or_init(|| {
        RegexSet::new([
            r"(?i)\btable\b",
            r"(?i)\bfigure\b",
            r"(?i)\bsection\b",
            r"(?i)\bappendix\b",
            r"(?i)\bpage\b",
            r"(?i)\bline\b",
            r"(?i)\bquote\b",
            r"(?i)\bcite\b",
            r"(?i)\bcitation\b",
            r"(?i)\bbleu\b",
            r"(?i)\baccuracy\b",
            r"(?i)\bf1\b",
            r"(?i)\bauc\b",
            r"(?i)\bperplexity\b",
            r"(?i)\bwhat did .* report\b",
            r"(?i)\baccording to\b",
            r"(?i)\bexact\b",
            r"(?i)\bspecific\b",
            r"(?i)\bnumber\b",
            r"(?i)\bvalue\b",
            r"(?i)\bscore\b",
            r"(?i)\bsummarize\b",
            r"(?i)\bsummary\b",
            r"(?i)\bverbatim\b",
            r"(?i)\bword-for-word\b",
        ])
        .expect("Invalid evidence pattern")
    })
}

fn parametric_hints() -> &'static RegexSet {
    PARAMETRIC_HINTS.get_or_init(|| {
        RegexSet::new([
            r"(?i)\bwhat is\b",
            r"(?i)\bexplain\b",
            r"(?i)\bwhy\b",
            r"(?i)\bhow does\b",
            r"(?i)\bintuition\b",
            r"(?i)\bconcept\b",
            r"(?i)\btrade-?off\b",
        ])
        .expect("Invalid parametric hint pattern")
    })
}

fn numeric_literal() -> &'static Regex {
    NUMERIC_LITERAL
        .get_or_init(|| Regex::new(r"\b(\d+(\.\d+)?)\b").expect("Invalid numeric pattern"))
}

fn empirical_term() -> &'static Regex {
    EMPIRICAL_TERM.get_or_init(|| {
        Regex::new(r"(?i)\b(report|reported|results|score|metric)\b")
            .expect("Invalid empirical term pattern")
    })
}

/// Rule-based retrieval-necessity classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier;

impl Classifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a question
    pub fn decide(&self, question: &str) -> RetrievalDecision {
        let q = question.trim();

        if evidence_patterns().is_match(q) {
            return decision(
                true,
                "evidence-dependent request (source-specific)",
                Confidence::High,
            );
        }

        if numeric_literal().is_match(q) && empirical_term().is_match(q) {
            return decision(true, "empirical value requested", Confidence::High);
        }

        if parametric_hints().is_match(q) {
            return decision(
                false,
                "conceptual/mechanistic answer likely parametric",
                Confidence::Medium,
            );
        }

        decision(false, "no strong evidence dependency detected", Confidence::Low)
    }
}

fn decision(required: bool, rationale: &str, confidence: Confidence) -> RetrievalDecision {
    RetrievalDecision {
        requires_external_evidence: required,
        decision_rationale: rationale.to_string(),
        confidence,
    }
}
