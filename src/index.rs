//! In-memory vector index with brute-force cosine search.
//!
//! Stores `(chunk, embedding)` pairs behind a `std::sync::RwLock`. The
//! lock is the single mutual-exclusion boundary of the whole pipeline:
//! inserts and clears take the write lock, searches the read lock, so a
//! search in flight during a clear sees either the pre-clear or the
//! post-clear state, never a mix. Reads proceed concurrently with each
//! other.
//!
//! The index dimension is pinned by the first inserted batch and every
//! later vector must match it — a mismatch means the embedding model
//! changed mid-session and the offending ingest is rejected wholesale.

use std::collections::HashSet;
use std::sync::RwLock;

use crate::error::RagError;
use crate::models::{Chunk, KnowledgeBaseStats};

/// A stored chunk plus its embedding and the denormalized metadata
/// needed to render a citation without a document lookup.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
    /// Source filename, carried for citation display.
    pub source_file: String,
}

struct IndexState {
    /// Pinned after the first insert; `None` while empty.
    dims: Option<usize>,
    entries: Vec<IndexEntry>,
}

/// Process-wide chunk vector store.
pub struct VectorIndex {
    inner: RwLock<IndexState>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(IndexState {
                dims: None,
                entries: Vec::new(),
            }),
        }
    }

    /// Insert a batch of entries atomically.
    ///
    /// All vectors are validated against the index dimension before any
    /// of them is stored, so a failed ingest never leaves a
    /// half-inserted document behind.
    pub fn insert(&self, batch: Vec<IndexEntry>) -> Result<(), RagError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut state = self.inner.write().unwrap();
        let expected = state.dims.unwrap_or(batch[0].vector.len());
        if expected == 0 {
            return Err(RagError::Configuration(
                "embedding vectors must not be empty".to_string(),
            ));
        }
        for entry in &batch {
            if entry.vector.len() != expected {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: entry.vector.len(),
                });
            }
        }
        state.dims = Some(expected);
        state.entries.extend(batch);
        Ok(())
    }

    /// Return the `k` nearest entries by cosine similarity, best first.
    ///
    /// Ties keep insertion order (the sort is stable over a snapshot
    /// taken in insertion order). An empty index yields an empty result,
    /// not an error.
    pub fn search(&self, query_vec: &[f32], k: usize) -> Vec<(IndexEntry, f32)> {
        let state = self.inner.read().unwrap();
        let mut scored: Vec<(IndexEntry, f32)> = state
            .entries
            .iter()
            .map(|e| (e.clone(), cosine_similarity(query_vec, &e.vector)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// Remove every entry and unpin the dimension.
    pub fn clear(&self) {
        let mut state = self.inner.write().unwrap();
        state.entries.clear();
        state.dims = None;
    }

    /// Live counters, computed from the stored entries.
    pub fn stats(&self) -> KnowledgeBaseStats {
        let state = self.inner.read().unwrap();
        let documents: HashSet<&str> = state
            .entries
            .iter()
            .map(|e| e.chunk.document_id.as_str())
            .collect();
        KnowledgeBaseStats {
            document_count: documents.len(),
            chunk_count: state.entries.len(),
        }
    }

    /// Pinned embedding dimension, if any vectors are stored.
    pub fn dims(&self) -> Option<usize> {
        self.inner.read().unwrap().dims
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().entries.is_empty()
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
