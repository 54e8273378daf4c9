//! Conductor data types
//!
//! Decisions, plans, and step results shared by the classifier, planner,
//! executor, and runtime.

use sdk::errors::EngineError;
use sdk::types::{RetrievalOutput, RetrievedChunk};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Confidence attached to a retrieval decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Question-only verdict on whether external evidence is needed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalDecision {
    pub requires_external_evidence: bool,
    /// Short label, not a chain of thought
    pub decision_rationale: String,
    pub confidence: Confidence,
}

/// Closed set of plan actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Retrieve,
    Noop,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Retrieve => "retrieve",
            Action::Noop => "noop",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retrieve" => Ok(Action::Retrieve),
            "noop" => Ok(Action::Noop),
            other => Err(EngineError::UnknownAction(other.to_string())),
        }
    }
}

/// One step of a plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    pub step_id: u32,
    pub action: Action,
    /// Named parameters; must be a JSON object to execute
    pub args: serde_json::Value,
    pub rationale: String,
}

/// An ordered, immutable action plan for one question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub objective: String,
    pub steps: Vec<PlanStep>,
}

/// Intermediate deserialization type for plans read from JSON
#[derive(Debug, Deserialize)]
struct RawPlan {
    objective: String,
    steps: Vec<RawPlanStep>,
}

#[derive(Debug, Deserialize)]
struct RawPlanStep {
    step_id: u32,
    action: String,
    #[serde(default)]
    args: serde_json::Value,
    #[serde(default)]
    rationale: String,
}

impl Plan {
    /// Parse a plan from JSON.
    ///
    /// Action names outside the closed set fail with `UnknownAction`. Argument
    /// shape is checked later by the executor, not here.
    pub fn from_json(raw: &str) -> Result<Self, EngineError> {
        let raw: RawPlan = serde_json::from_str(raw)?;
        let steps = raw
            .steps
            .into_iter()
            .map(|s| {
                Ok(PlanStep {
                    step_id: s.step_id,
                    action: s.action.parse()?,
                    args: s.args,
                    rationale: s.rationale,
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        Ok(Plan {
            objective: raw.objective,
            steps,
        })
    }

    /// Actions in step order
    pub fn actions(&self) -> Vec<Action> {
        self.steps.iter().map(|s| s.action).collect()
    }
}

/// Raw output of a tool invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolResult {
    Retrieval(RetrievalOutput),
    Empty {},
}

impl ToolResult {
    /// Chunks carried by the result; empty for non-retrieval tools
    pub fn chunks(&self) -> &[RetrievedChunk] {
        match self {
            ToolResult::Retrieval(out) => &out.chunks,
            ToolResult::Empty {} => &[],
        }
    }
}

/// Structured record of one executed step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub step_id: u32,
    pub action: Action,
    pub args: serde_json::Value,
    pub tool_result: ToolResult,
    /// Cheap summary of the tool result, e.g. `{"num_chunks": 4}`
    pub result_meta: serde_json::Value,
}
