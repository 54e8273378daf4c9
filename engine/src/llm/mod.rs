//! Language model backends
//!
//! Implementations of `sdk::LanguageModel` selectable from configuration:
//! an offline echo model and a local Ollama server.

pub mod ollama;

pub use ollama::OllamaModel;

use crate::config::Config;
use async_trait::async_trait;
use sdk::collaborators::LanguageModel;
use sdk::errors::EngineError;
use std::sync::Arc;

/// Offline placeholder model.
///
/// Returns a deterministic echo of the question and context so the full
/// pipeline runs without a model server.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoModel;

#[async_trait]
impl LanguageModel for EchoModel {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, prompt: &str) -> Result<String, EngineError> {
        Ok(format!("[echo]\n{}", prompt.trim_end()))
    }
}

/// Build the language model named by `config.llm.provider`
pub fn from_config(config: &Config) -> Result<Arc<dyn LanguageModel>, EngineError> {
    match config.llm.provider.as_str() {
        "echo" => Ok(Arc::new(EchoModel)),
        "ollama" => Ok(Arc::new(OllamaModel::new(
            &config.llm.ollama.base_url,
            &config.llm.ollama.model,
        )?)),
        other => Err(EngineError::Config(format!("Unknown LLM provider: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_model_is_deterministic() {
        let a = EchoModel.complete("Question:\nq\n").await.unwrap();
        let b = EchoModel.complete("Question:\nq\n").await.unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("[echo]"));
        assert!(a.contains("Question:\nq"));
    }

    #[test]
    fn test_from_config_selects_provider() {
        let mut config = Config::default();
        assert_eq!(from_config(&config).unwrap().name(), "echo");

        config.llm.provider = "ollama".to_string();
        assert_eq!(from_config(&config).unwrap().name(), "ollama");

        config.llm.provider = "gpt".to_string();
        assert!(matches!(from_config(&config), Err(EngineError::Config(_))));
    }
}
