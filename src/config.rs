//! TOML configuration parsing and validation.
//!
//! All tunables are read from a single TOML file; every section has
//! defaults mirroring the original deployment (chunk size 500 / overlap
//! 50, Groq-hosted llama3 for generation, OpenAI embeddings), so a
//! minimal config only needs to override what differs. Validation
//! failures are [`RagError::Configuration`] and fatal at startup —
//! nothing downstream re-checks these invariants.

use serde::Deserialize;
use std::path::Path;

use crate::context::SYSTEM_INSTRUCTION;
use crate::error::RagError;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks returned per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum cosine similarity for a chunk to count as relevant.
    #[serde(default)]
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: 0.0,
        }
    }
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    /// Hard character budget for the assembled prompt.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    /// Most recent conversation turns included in the prompt and kept
    /// per session.
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_chars: default_max_context_chars(),
            max_history_turns: default_max_history_turns(),
        }
    }
}

fn default_max_context_chars() -> usize {
    8000
}
fn default_max_history_turns() -> usize {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dims")]
    pub dims: usize,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: default_embedding_dims(),
            base_url: default_embedding_base_url(),
            api_key_env: default_embedding_api_key_env(),
            timeout_secs: default_embedding_timeout_secs(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_embedding_dims() -> usize {
    1536
}
fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_embedding_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_embedding_timeout_secs() -> u64 {
    30
}
fn default_batch_size() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: default_llm_base_url(),
            api_key_env: default_llm_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_model() -> String {
    "llama3-8b-8192".to_string()
}
fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_llm_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    /// Maximum accepted document size in bytes.
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: default_max_document_bytes(),
        }
    }
}

fn default_max_document_bytes() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7343".to_string()
}

impl Config {
    /// Check cross-field invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunking.chunk_size == 0 {
            return Err(RagError::Configuration(
                "chunking.chunk_size must be > 0".to_string(),
            ));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(RagError::Configuration(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(RagError::Configuration(
                "retrieval.top_k must be >= 1".to_string(),
            ));
        }
        if self.context.max_context_chars <= SYSTEM_INSTRUCTION.len() {
            return Err(RagError::Configuration(format!(
                "context.max_context_chars ({}) cannot fit the system instruction ({} chars)",
                self.context.max_context_chars,
                SYSTEM_INSTRUCTION.len()
            )));
        }
        if self.embedding.dims == 0 {
            return Err(RagError::Configuration(
                "embedding.dims must be > 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(RagError::Configuration(
                "llm.temperature must be in [0.0, 2.0]".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config, RagError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        RagError::Configuration(format!("failed to read config file {}: {}", path.display(), e))
    })?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| RagError::Configuration(format!("failed to parse config file: {}", e)))?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = Config::default();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.llm.model, "llama3-8b-8192");
        assert_eq!(config.limits.max_document_bytes, 10 * 1024 * 1024);
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_toml_is_valid() {
        let config: Config = toml::from_str("").unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: Config = toml::from_str(
            r#"
[chunking]
chunk_size = 800

[retrieval]
top_k = 3
min_score = 0.25
"#,
        )
        .unwrap();
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.retrieval.top_k, 3);
        assert!((config.retrieval.min_score - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_overlap_not_smaller_than_size_rejected() {
        let config: Config = toml::from_str(
            r#"
[chunking]
chunk_size = 100
chunk_overlap = 100
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(RagError::Configuration(_))
        ));
    }

    #[test]
    fn test_tiny_context_budget_rejected() {
        let config: Config = toml::from_str(
            r#"
[context]
max_context_chars = 10
"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(RagError::Configuration(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm]\nmodel = \"llama3-70b-8192\"").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.llm.model, "llama3-70b-8192");
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/ragmill.toml")).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
    }
}
