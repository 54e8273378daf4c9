//! Conductor Planner
//!
//! Combines the classifier verdict with the memory advisory signal to build
//! a `Plan`. The planner owns the final retrieve/noop choice.

use crate::conductor::classifier::Classifier;
use crate::conductor::types::{Action, Plan, PlanStep, RetrievalDecision};
use crate::memory::working::WorkingMemory;
use serde_json::json;

/// Rationale used when retrieval is forced by memory rather than the question
pub const MEMORY_OVERRIDE_RATIONALE: &str =
    "retrieval chosen despite parametric uncertainty due to memory signal";

#[derive(Debug, Clone, Copy, Default)]
pub struct Planner {
    classifier: Classifier,
}

impl Planner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a plan for `question`.
    ///
    /// Retrieves when the question needs external evidence or `advisory` is
    /// set; otherwise emits a single noop step.
    pub fn plan(
        &self,
        question: &str,
        k: usize,
        advisory: bool,
        wm: Option<&mut WorkingMemory>,
    ) -> Plan {
        self.decide_and_plan(question, k, advisory, wm).1
    }

    /// Same as [`Planner::plan`], also returning the classifier verdict
    pub fn decide_and_plan(
        &self,
        question: &str,
        k: usize,
        advisory: bool,
        wm: Option<&mut WorkingMemory>,
    ) -> (RetrievalDecision, Plan) {
        let decision = self.classifier.decide(question);

        if let Some(wm) = wm {
            wm.think(format!("Planner evaluating retrieval need for: {}", question));
            if advisory {
                wm.think("Memory advises retrieval");
            }
        }

        let step = if decision.requires_external_evidence || advisory {
            let rationale = if decision.requires_external_evidence {
                decision.decision_rationale.clone()
            } else {
                MEMORY_OVERRIDE_RATIONALE.to_string()
            };
            PlanStep {
                step_id: 1,
                action: Action::Retrieve,
                args: json!({ "question": question, "k": k }),
                rationale,
            }
        } else {
            PlanStep {
                step_id: 1,
                action: Action::Noop,
                args: json!({}),
                rationale: decision.decision_rationale.clone(),
            }
        };

        tracing::info!(
            action = %step.action,
            requires_external_evidence = decision.requires_external_evidence,
            advisory,
            "Plan generated"
        );

        let plan = Plan {
            objective: question.to_string(),
            steps: vec![step],
        };
        (decision, plan)
    }
}
