//! Error taxonomy for the RAG pipeline.
//!
//! Every fallible core operation returns [`RagError`]. The variants map
//! directly onto how the failure should be handled at the boundary:
//!
//! | Variant | Severity | Safe to retry? |
//! |---------|----------|----------------|
//! | [`Configuration`](RagError::Configuration) | fatal at startup | no |
//! | [`UnsupportedFormat`](RagError::UnsupportedFormat) | per-request | no |
//! | [`OversizedInput`](RagError::OversizedInput) | per-request | no |
//! | [`DimensionMismatch`](RagError::DimensionMismatch) | fatal to that ingest | no |
//! | [`EmbeddingUnavailable`](RagError::EmbeddingUnavailable) | transient, provider-side | yes |
//! | [`Generation`](RagError::Generation) | transient, provider-side | yes |
//!
//! Provider-side failures keep the underlying cause in the error source
//! chain for diagnostics; the `Display` message is what a caller may show
//! to an end user, so raw provider output never appears there.

use thiserror::Error;

/// Unified error type for ingest, retrieval, and generation.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid chunking, context, or provider parameters.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The uploaded document's source type is not one of pdf, txt, md.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// The uploaded document exceeds the configured size limit.
    #[error("document too large: {size} bytes (limit {limit})")]
    OversizedInput { size: usize, limit: usize },

    /// A vector's dimension does not match the index's fixed dimension.
    ///
    /// Indicates the embedding model changed mid-session. The offending
    /// ingest is rejected wholesale; the index is left untouched.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The embedding provider errored or timed out.
    #[error("embedding provider unavailable")]
    EmbeddingUnavailable(#[source] anyhow::Error),

    /// The LLM provider errored, timed out, or returned an empty response.
    #[error("answer generation failed")]
    Generation(#[source] anyhow::Error),
}

impl RagError {
    /// True for transient provider-side failures where retrying the same
    /// request is safe (no partial state was mutated).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingUnavailable(_) | RagError::Generation(_)
        )
    }
}
