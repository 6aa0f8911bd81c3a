//! Embedding provider abstraction and the OpenAI-compatible implementation.
//!
//! Defines the [`Embedder`] trait that converts text into fixed-length
//! vectors, plus [`OpenAiEmbedder`], which calls any OpenAI-compatible
//! `POST /embeddings` endpoint.
//!
//! Provider failures surface as [`RagError::EmbeddingUnavailable`] with
//! the HTTP detail kept in the error source chain. Calls are bounded by
//! the configured timeout and are never retried here — a transient
//! failure is reported upward so the caller decides whether to retry.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::RagError;

/// Capability interface for embedding backends.
///
/// One method does the work; the metadata accessors let the index pin
/// the vector dimension up front. Implementations must be cheap to share
/// (`Arc<dyn Embedder>`) across concurrent queries.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embed a single query text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| RagError::EmbeddingUnavailable(anyhow!("empty embedding response")))
    }
}

/// Embedding provider for OpenAI-compatible `POST /embeddings` APIs.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dims: usize,
    batch_size: usize,
}

impl OpenAiEmbedder {
    /// Build a provider from configuration.
    ///
    /// Fails with [`RagError::Configuration`] if the API key environment
    /// variable is unset or the HTTP client cannot be constructed.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, RagError> {
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
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            dims: config.dims,
            batch_size: config.batch_size,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("embedding request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("embedding API error {}: {}", status, detail));
        }

        let json: serde_json::Value = response.json().await?;
        parse_embeddings_response(&json)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embedded = self
                .embed_batch(batch)
                .await
                .map_err(RagError::EmbeddingUnavailable)?;
            if embedded.len() != batch.len() {
                return Err(RagError::EmbeddingUnavailable(anyhow!(
                    "provider returned {} vectors for {} inputs",
                    embedded.len(),
                    batch.len()
                )));
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }
}

/// Parse an OpenAI-style embeddings response.
///
/// Extracts the `data[].embedding` arrays in `data[].index` order so the
/// output lines up with the input batch.
fn parse_embeddings_response(json: &serde_json::Value) -> anyhow::Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("invalid embeddings response: missing data array"))?;

    let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

    for (pos, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow!("invalid embeddings response: missing embedding"))?;
        let vector: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        indexed.push((index, vector));
    }

    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

/// Create the configured [`Embedder`].
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, RagError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        other => Err(RagError::Configuration(format!(
            "unknown embedding provider: '{}' (expected 'openai')",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_embeddings_response() {
        let json = serde_json::json!({
            "data": [
                { "index": 0, "embedding": [1.0, 2.0] },
                { "index": 1, "embedding": [3.0, 4.0] },
            ]
        });
        let vectors = parse_embeddings_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_parse_reorders_by_index() {
        let json = serde_json::json!({
            "data": [
                { "index": 1, "embedding": [3.0] },
                { "index": 0, "embedding": [1.0] },
            ]
        });
        let vectors = parse_embeddings_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![3.0]]);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_embeddings_response(&serde_json::json!({})).is_err());
        assert!(
            parse_embeddings_response(&serde_json::json!({ "data": [{ "no_embedding": [] }] }))
                .is_err()
        );
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = EmbeddingConfig {
            provider: "chroma".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(matches!(
            create_embedder(&config),
            Err(RagError::Configuration(_))
        ));
    }
}
