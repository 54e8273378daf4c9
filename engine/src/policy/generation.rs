//! Generation Policy
//!
//! The single chokepoint between evidence and text generation. Maps an
//! `EvidenceAssessment` to answer, hedge, or refuse with a reason code. It
//! never consults retrieval, memory, or a model.

use crate::evidence::{EvidenceAssessment, Sufficiency};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Answer,
    Hedge,
    Refuse,
}

/// Why generation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefusalCode {
    NoEvidence,
    InsufficientCoverage,
    /// Reserved
    ConflictingEvidence,
    /// Reserved
    ParametricNotAllowed,
}

/// Why the answer was hedged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HedgeCode {
    ConflictingSources,
    /// Reserved
    PartialSupport,
}

/// Outcome of the generation policy.
///
/// At most one code is set and it matches `decision`; `Answer` carries none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationDecision {
    pub decision: Decision,
    pub refusal_code: Option<RefusalCode>,
    pub hedge_code: Option<HedgeCode>,
    pub rationale: Option<String>,
}

impl GenerationDecision {
    pub fn refuse(code: RefusalCode, rationale: impl Into<String>) -> Self {
        Self {
            decision: Decision::Refuse,
            refusal_code: Some(code),
            hedge_code: None,
            rationale: Some(rationale.into()),
        }
    }

    pub fn hedge(code: HedgeCode, rationale: impl Into<String>) -> Self {
        Self {
            decision: Decision::Hedge,
            refusal_code: None,
            hedge_code: Some(code),
            rationale: Some(rationale.into()),
        }
    }

    pub fn answer(rationale: impl Into<String>) -> Self {
        Self {
            decision: Decision::Answer,
            refusal_code: None,
            hedge_code: None,
            rationale: Some(rationale.into()),
        }
    }
}

/// Pure evidence-to-decision mapping
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationPolicy;

impl GenerationPolicy {
    pub fn decide(evidence: &EvidenceAssessment) -> GenerationDecision {
        let rationale = evidence.rationale.clone();
        match (evidence.sufficiency, evidence.evidence_present) {
            (Sufficiency::Insufficient, false) => {
                GenerationDecision::refuse(RefusalCode::NoEvidence, rationale)
            }
            (Sufficiency::Insufficient, true) => {
                GenerationDecision::refuse(RefusalCode::InsufficientCoverage, rationale)
            }
            (Sufficiency::Conflicting, _) => {
                GenerationDecision::hedge(HedgeCode::ConflictingSources, rationale)
            }
            (Sufficiency::Sufficient, _) => GenerationDecision::answer(rationale),
        }
    }
}
