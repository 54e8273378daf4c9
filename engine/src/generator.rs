//! Policy-gated generation
//!
//! Selects the prompt template for a `GenerationDecision` and calls the
//! injected language model. It never decides whether to generate; a refusal
//! returns fixed text without touching the model.

use crate::policy::generation::{Decision, GenerationDecision};
use sdk::collaborators::LanguageModel;
use sdk::errors::EngineError;

pub const REFUSAL_TEMPLATE: &str =
    "I don\u{2019}t have sufficient reliable information to answer this question.\n";

const ANSWER_PREAMBLE: &str = "You must answer the question using ONLY the provided context.\n\
If the context does not fully support a claim, do not make it.\n";

const HEDGE_PREAMBLE: &str = "The evidence is incomplete or conflicting.\n\
Provide a cautious, qualified response.\n\
Explicitly acknowledge uncertainty and do not invent details.\n";

/// Render the answer prompt
pub fn answer_prompt(question: &str, context: &str) -> String {
    render(ANSWER_PREAMBLE, question, context)
}

/// Render the hedge prompt
pub fn hedge_prompt(question: &str, context: &str) -> String {
    render(HEDGE_PREAMBLE, question, context)
}

fn render(preamble: &str, question: &str, context: &str) -> String {
    format!(
        "{}\nQuestion:\n{}\n\nContext:\n{}\n",
        preamble, question, context
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Generator;

impl Generator {
    pub fn new() -> Self {
        Self
    }

    /// Produce the final text for `decision`
    pub async fn generate(
        &self,
        question: &str,
        context: &str,
        decision: &GenerationDecision,
        model: &dyn LanguageModel,
    ) -> Result<String, EngineError> {
        let prompt = match decision.decision {
            Decision::Refuse => return Ok(REFUSAL_TEMPLATE.to_string()),
            Decision::Hedge => hedge_prompt(question, context),
            Decision::Answer => answer_prompt(question, context),
        };

        tracing::debug!(
            model = model.name(),
            decision = ?decision.decision,
            prompt_chars = prompt.len(),
            "Calling language model"
        );
        model.complete(&prompt).await
    }
}
