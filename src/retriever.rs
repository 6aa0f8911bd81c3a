//! Query-time retrieval: embed, rank, threshold.
//!
//! The retriever embeds the query text through the [`Embedder`] seam,
//! ranks the index by cosine similarity, and filters out chunks below
//! the configured relevance threshold. An empty result is a valid
//! outcome meaning "no relevant context" — it is not an error, and it
//! is distinct from the embedder being unreachable, which must surface
//! as [`RagError::EmbeddingUnavailable`] rather than silently degrading
//! answer grounding.

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::embedding::Embedder;
use crate::error::RagError;
use crate::index::{IndexEntry, VectorIndex};

/// A retrieved chunk with its relevance score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub entry: IndexEntry,
    pub score: f32,
}

impl ScoredChunk {
    /// Human-readable source label for citation display,
    /// e.g. `"report.pdf (chunk 3)"`.
    pub fn source_label(&self) -> String {
        format!(
            "{} (chunk {})",
            self.entry.source_file, self.entry.chunk.ordinal
        )
    }
}

/// Embeds queries and selects the top-k most relevant index entries.
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    min_score: f32,
}

impl Retriever {
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn Embedder>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            top_k: config.top_k,
            min_score: config.min_score,
        }
    }

    /// Retrieve up to `top_k` chunks relevant to `query_text`, best
    /// first, excluding anything scoring below the threshold.
    pub async fn retrieve(&self, query_text: &str) -> Result<Vec<ScoredChunk>, RagError> {
        let query_vec = self.embedder.embed_one(query_text).await?;
        let results = self.index.search(&query_vec, self.top_k);
        Ok(results
            .into_iter()
            .filter(|(_, score)| *score >= self.min_score)
            .map(|(entry, score)| ScoredChunk { entry, score })
            .collect())
    }
}
