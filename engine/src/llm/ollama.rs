//! Ollama language model backend
//!
//! Sends fully rendered prompts to a local Ollama server via
//! `POST /api/generate` with streaming disabled. Single attempt; failures are
//! mapped to `EngineError::Generation`.

use async_trait::async_trait;
use reqwest::Client;
use sdk::collaborators::LanguageModel;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request timeout for one completion
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct OllamaModel {
    /// Base URL for the Ollama API (typically http://localhost:11434)
    base_url: String,

    /// Model name (e.g. "llama3.1:8b")
    model: String,

    client: Client,
}

impl OllamaModel {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EngineError::Generation(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, prompt: &str) -> Result<String, EngineError> {
        tracing::debug!(
            "Ollama request: model={}, prompt_chars={}",
            self.model,
            prompt.len()
        );

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let url = format!("{}/api/generate", self.base_url);
        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Generation("Ollama request timed out".to_string())
                } else if e.is_connect() {
                    EngineError::Generation(format!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.base_url
                    ))
                } else {
                    EngineError::Generation(e.to_string())
                }
            })?;

        tracing::info!(
            "Ollama response received in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EngineError::Generation(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            EngineError::Generation(format!("Failed to parse Ollama response: {}", e))
        })?;

        Ok(body.response)
    }
}

/// `/api/generate` request body
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// `/api/generate` response body
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[allow(dead_code)]
    #[serde(default)]
    done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_properties() {
        let model = OllamaModel::new("http://localhost:11434/", "llama3.1:8b").unwrap();
        assert_eq!(model.name(), "ollama");
        assert_eq!(model.model(), "llama3.1:8b");
        assert_eq!(model.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, serde_json::json!({"model": "m", "prompt": "p", "stream": false}));
    }

    #[test]
    fn test_response_parsing() {
        let body: GenerateResponse =
            serde_json::from_str(r#"{"model":"m","response":"hello","done":true}"#).unwrap();
        assert_eq!(body.response, "hello");
    }
}
