//! Evidence Assessor
//!
//! Judges whether the candidates gathered by the executor are adequate to
//! answer a question. The verdict feeds the generation policy; the assessor
//! itself never calls retrieval or the language model.

use crate::conductor::types::Action;
use crate::evidence::scorer;
use crate::text::DEFAULT_KEY_TERMS;
use sdk::types::RetrievedChunk;
use serde::{Deserialize, Serialize};

/// Thresholds used by the assessor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvidenceThresholds {
    /// A candidate at or above this comparable score counts as evidence
    pub min_similarity: f64,
    /// Minimum key-term coverage for a sufficient verdict
    pub coverage: f64,
    /// Score above which distinct sources are treated as conflicting
    pub conflict: f64,
    /// Number of query key terms considered for coverage
    pub key_terms: usize,
}

impl Default for EvidenceThresholds {
    fn default() -> Self {
        Self {
            min_similarity: 0.5,
            coverage: 0.5,
            conflict: 0.8,
            key_terms: DEFAULT_KEY_TERMS,
        }
    }
}

/// Tri-state sufficiency verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sufficiency {
    Sufficient,
    Insufficient,
    Conflicting,
}

/// Verdict plus the signals that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceAssessment {
    pub evidence_present: bool,
    pub sufficiency: Sufficiency,
    pub max_similarity: f64,
    pub coverage_score: f64,
    pub conflicting_sources: bool,
    pub rationale: String,
}

/// Rule-based evidence assessor
#[derive(Debug, Clone, Default)]
pub struct EvidenceAssessor {
    thresholds: EvidenceThresholds,
}

impl EvidenceAssessor {
    pub fn new(thresholds: EvidenceThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &EvidenceThresholds {
        &self.thresholds
    }

    /// Assess the candidates produced for `query`.
    ///
    /// Rules are checked in order and the first match decides:
    /// no retrieval, nothing above the similarity floor, conflicting
    /// sources, low coverage, otherwise sufficient.
    pub fn assess(
        &self,
        query: &str,
        executor_decision: Action,
        chunks: &[RetrievedChunk],
    ) -> EvidenceAssessment {
        let t = &self.thresholds;

        if executor_decision != Action::Retrieve {
            return EvidenceAssessment {
                evidence_present: false,
                sufficiency: Sufficiency::Insufficient,
                max_similarity: 0.0,
                coverage_score: 0.0,
                conflicting_sources: false,
                rationale: "No retrieval executed; no external evidence available.".to_string(),
            };
        }

        let max_similarity = scorer::max_similarity(chunks);
        let evidence_present = scorer::evidence_present(chunks, t.min_similarity);
        let coverage_score = scorer::coverage(chunks, query, t.key_terms);
        let conflicting_sources = scorer::conflicting_sources(chunks, t.conflict);

        tracing::debug!(
            max_similarity,
            coverage_score,
            conflicting_sources,
            num_chunks = chunks.len(),
            "Evidence signals computed"
        );

        let (sufficiency, rationale) = if !evidence_present {
            (
                Sufficiency::Insufficient,
                format!("No chunk met similarity threshold ({}).", t.min_similarity),
            )
        } else if conflicting_sources {
            (
                Sufficiency::Conflicting,
                "Multiple high-scoring sources retrieved; treat as potentially conflicting."
                    .to_string(),
            )
        } else if coverage_score < t.coverage {
            (
                Sufficiency::Insufficient,
                format!(
                    "Low key-term coverage ({:.2} < {}).",
                    coverage_score, t.coverage
                ),
            )
        } else {
            (
                Sufficiency::Sufficient,
                "Evidence present; coverage threshold met; no conflicts detected.".to_string(),
            )
        };

        EvidenceAssessment {
            evidence_present,
            sufficiency,
            max_similarity,
            coverage_score,
            conflicting_sources,
            rationale,
        }
    }
}
