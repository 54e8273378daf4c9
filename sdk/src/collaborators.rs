//! Collaborator traits
//!
//! The engine consumes retrieval and text generation through these two narrow
//! traits. Implementations are injected by the caller; the engine never
//! constructs or owns them.

use crate::errors::EngineError;
use crate::types::RetrievalOutput;
use async_trait::async_trait;

/// Retrieval backend: question in, ranked candidate chunks out
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns the name of the retriever
    fn name(&self) -> &str;

    /// Retrieve up to `k` chunks for `question`
    async fn retrieve(&self, question: &str, k: usize) -> Result<RetrievalOutput, EngineError>;
}

/// Text generation backend: prompt in, completion out
///
/// Cancellation and timeouts are the implementation's concern.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the name of the model backend
    fn name(&self) -> &str;

    /// Complete a fully rendered prompt
    async fn complete(&self, prompt: &str) -> Result<String, EngineError>;
}

/// Adapts a plain synchronous function into a [`LanguageModel`].
///
/// ```
/// use sdk::collaborators::{LanguageModel, PromptFn};
///
/// let model = PromptFn::new(|prompt: &str| format!("{} chars", prompt.len()));
/// assert_eq!(model.name(), "prompt-fn");
/// ```
pub struct PromptFn<F> {
    call: F,
}

impl<F> PromptFn<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    pub fn new(call: F) -> Self {
        Self { call }
    }
}

#[async_trait]
impl<F> LanguageModel for PromptFn<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn name(&self) -> &str {
        "prompt-fn"
    }

    async fn complete(&self, prompt: &str) -> Result<String, EngineError> {
        Ok((self.call)(prompt))
    }
}
