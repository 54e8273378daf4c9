//! Conductor Executor
//!
//! Runs plan steps in order against the fixed tool set. Each step produces a
//! `StepResult`; the first failure aborts the remaining steps.

use crate::conductor::types::{Action, Plan, PlanStep, StepResult, ToolResult};
use crate::memory::working::{WorkingMemory, USED_RETRIEVAL};
use sdk::collaborators::Retriever;
use sdk::errors::EngineError;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Retrieval depth used when a retrieve step omits `k`
pub const DEFAULT_K: usize = 4;

/// Executes plans against the retrieval and no-op tools
pub struct Executor {
    retriever: Arc<dyn Retriever>,
}

impl Executor {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { retriever }
    }

    /// Execute every step of `plan` in order.
    ///
    /// Appends one thought per step to `wm` and sets `used_retrieval` when a
    /// retrieve step runs. No retries.
    pub async fn execute(
        &self,
        plan: &Plan,
        wm: &mut WorkingMemory,
    ) -> Result<Vec<StepResult>, EngineError> {
        let mut trace = Vec::with_capacity(plan.steps.len());

        for step in &plan.steps {
            let result = self.execute_step(step).await?;

            wm.think(format!("Executed step {}: {}", step.step_id, step.action));
            if step.action == Action::Retrieve {
                wm.set_flag(USED_RETRIEVAL, true);
            }

            trace.push(result);
        }

        info!(steps = trace.len(), "Plan executed");
        Ok(trace)
    }

    /// Execute a single step
    pub async fn execute_step(&self, step: &PlanStep) -> Result<StepResult, EngineError> {
        let args = step.args.as_object().ok_or_else(|| EngineError::InvalidArgs {
            step_id: step.step_id,
            reason: format!("got {}", json_kind(&step.args)),
        })?;

        let tool_result = match step.action {
            Action::Retrieve => {
                let question = args
                    .get("question")
                    .and_then(|q| q.as_str())
                    .ok_or_else(|| EngineError::InvalidArgs {
                        step_id: step.step_id,
                        reason: "'question' must be a string".to_string(),
                    })?;
                let k = match args.get("k") {
                    None => DEFAULT_K,
                    Some(v) => v.as_u64().map(|k| k as usize).ok_or_else(|| {
                        EngineError::InvalidArgs {
                            step_id: step.step_id,
                            reason: "'k' must be a non-negative integer".to_string(),
                        }
                    })?,
                };

                debug!(step_id = step.step_id, k, retriever = self.retriever.name(), "Retrieving");
                ToolResult::Retrieval(self.retriever.retrieve(question, k).await?)
            }
            Action::Noop => ToolResult::Empty {},
        };

        let result_meta = match &tool_result {
            ToolResult::Retrieval(out) => json!({ "num_chunks": out.chunks.len() }),
            ToolResult::Empty {} => json!({}),
        };

        Ok(StepResult {
            step_id: step.step_id,
            action: step.action,
            args: step.args.clone(),
            tool_result,
            result_meta,
        })
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
