//! Language model abstraction and the OpenAI-compatible chat provider.
//!
//! [`LanguageModel`] is the single seam between prompt assembly and
//! answer generation. The concrete provider speaks the OpenAI chat
//! completions wire format, which also covers Groq and most local
//! inference servers via `base_url`.
//!
//! All provider-side failures — HTTP errors, timeouts, and empty
//! responses — collapse into [`RagError::Generation`]; the raw provider
//! detail stays in the error source chain and is never used as the
//! user-facing message.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::RagError;

/// Capability interface for answer-generating models.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier (e.g. `"llama3-8b-8192"`).
    fn model_name(&self) -> &str;

    /// Generate a completion for a system instruction plus user message.
    ///
    /// The returned text is untrusted model output; callers must not
    /// assume any structure beyond "some non-empty text".
    async fn complete(&self, system: &str, user: &str) -> Result<String, RagError>;
}

/// Chat completions provider for OpenAI-compatible APIs (OpenAI, Groq,
/// llama.cpp server, vLLM).
pub struct OpenAiChatModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiChatModel {
    pub fn new(config: &LlmConfig) -> Result<Self, RagError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            RagError::Configuration(format!(
                "{} environment variable not set",
                config.api_key_env
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    async fn request_completion(&self, system: &str, user: &str) -> anyhow::Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("chat API error {}: {}", status, detail));
        }

        let json: serde_json::Value = response.json().await?;
        parse_chat_response(&json)
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, RagError> {
        let text = self
            .request_completion(system, user)
            .await
            .map_err(RagError::Generation)?;
        if text.trim().is_empty() {
            return Err(RagError::Generation(anyhow!("provider returned an empty completion")));
        }
        Ok(text)
    }
}

/// Extract `choices[0].message.content` from a chat completions response.
fn parse_chat_response(json: &serde_json::Value) -> anyhow::Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| anyhow!("invalid chat response: missing choices[0].message.content"))
}

/// Create the configured [`LanguageModel`].
pub fn create_model(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>, RagError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiChatModel::new(config)?)),
        other => Err(RagError::Configuration(format!(
            "unknown llm provider: '{}' (expected 'openai')",
            other
        ))),
    }
}
