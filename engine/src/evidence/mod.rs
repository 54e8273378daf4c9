//! Evidence scoring and sufficiency assessment

pub mod assessor;
pub mod scorer;

pub use assessor::{EvidenceAssessment, EvidenceAssessor, EvidenceThresholds, Sufficiency};
