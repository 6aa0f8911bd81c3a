//! Knowledge base orchestration: ingest, query, clear, stats.
//!
//! Ties the pipeline together around two states — **Empty** (no
//! documents) and **Populated**. Ingest moves Empty→Populated; clear
//! moves any state→Empty; a query against an empty base short-circuits
//! to a fixed no-knowledge answer without spending an embedding or LLM
//! call on a guaranteed-empty index.
//!
//! Failure discipline: answering a query never mutates the index, and a
//! failed ingest never leaves a half-inserted document — chunks are
//! embedded before anything touches the index, and the index insert
//! itself is a single atomic batch.
//!
//! The document registry lock doubles as the commit boundary: the
//! dedup re-check, the index insert, and the registry update happen
//! under one guard, and clearing takes the same guard, so concurrent
//! identical uploads collapse to one document and a clear never
//! interleaves with a half-committed ingest.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::chunker::split_document;
use crate::config::Config;
use crate::context::ContextAssembler;
use crate::embedding::Embedder;
use crate::error::RagError;
use crate::index::{IndexEntry, VectorIndex};
use crate::llm::LanguageModel;
use crate::models::{content_hash, Document, KnowledgeBaseStats, SourceType};
use crate::retriever::Retriever;
use crate::session::{Role, SessionStore};
use crate::synthesize::{AnswerSynthesizer, Citation};

/// Answer returned for queries against an empty knowledge base.
pub const NO_KNOWLEDGE_ANSWER: &str =
    "No documents have been uploaded yet, so there is nothing to answer from. \
Upload a document and ask again.";

/// Result of ingesting one document.
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    pub document_id: String,
    /// Zero when the upload was a duplicate of an existing document.
    pub chunks_created: usize,
}

/// Result of answering one query.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub answer: String,
    pub cited_sources: Vec<Citation>,
}

/// Owns the vector index, document registry, and per-session histories.
///
/// One instance per process; shared across transports via `Arc`.
pub struct KnowledgeBase {
    chunk_size: usize,
    chunk_overlap: usize,
    max_document_bytes: usize,
    index: Arc<VectorIndex>,
    /// `(filename, content hash) → document id`, for duplicate uploads.
    /// Its lock is also the ingest/clear commit boundary.
    documents: Mutex<HashMap<(String, String), String>>,
    embedder: Arc<dyn Embedder>,
    retriever: Retriever,
    assembler: ContextAssembler,
    synthesizer: AnswerSynthesizer,
    sessions: SessionStore,
}

impl KnowledgeBase {
    pub fn new(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        let index = Arc::new(VectorIndex::new());
        Self {
            chunk_size: config.chunking.chunk_size,
            chunk_overlap: config.chunking.chunk_overlap,
            max_document_bytes: config.limits.max_document_bytes,
            retriever: Retriever::new(index.clone(), embedder.clone(), &config.retrieval),
            assembler: ContextAssembler::new(&config.context),
            synthesizer: AnswerSynthesizer::new(model),
            sessions: SessionStore::new(config.context.max_history_turns),
            documents: Mutex::new(HashMap::new()),
            embedder,
            index,
        }
    }

    /// Ingest a document: chunk, embed, and index it atomically.
    ///
    /// `source_type` must name one of the supported formats (`pdf`,
    /// `txt`, `md`); format parsing itself happens upstream and this
    /// method only ever sees extracted text. Re-uploading identical
    /// content under the same filename is a no-op returning the
    /// existing document id.
    pub async fn ingest_document(
        &self,
        filename: &str,
        raw_text: &str,
        source_type: &str,
    ) -> Result<IngestReceipt, RagError> {
        let source = SourceType::parse(source_type)?;

        if raw_text.len() > self.max_document_bytes {
            return Err(RagError::OversizedInput {
                size: raw_text.len(),
                limit: self.max_document_bytes,
            });
        }

        let dedup_key = (filename.to_string(), content_hash(raw_text));
        if let Some(existing) = self.documents.lock().unwrap().get(&dedup_key) {
            return Ok(IngestReceipt {
                document_id: existing.clone(),
                chunks_created: 0,
            });
        }

        let doc = Document::new(filename, raw_text.to_string(), source);
        let chunks = split_document(&doc.id, &doc.text, self.chunk_size, self.chunk_overlap)?;

        // Embed everything before touching the index: a provider failure
        // here leaves the knowledge base exactly as it was.
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(RagError::EmbeddingUnavailable(anyhow::anyhow!(
                "expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            )));
        }
        let expected_dims = self.index.dims().unwrap_or_else(|| self.embedder.dims());
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected_dims) {
            return Err(RagError::DimensionMismatch {
                expected: expected_dims,
                actual: bad.len(),
            });
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry {
                chunk,
                vector,
                source_file: doc.filename.clone(),
            })
            .collect();
        let chunks_created = entries.len();

        // Commit under the registry lock. The dedup check ran before the
        // embed await, so a racing identical upload may have finished in
        // the meantime; the re-check makes the winner's insert the only
        // one.
        let mut documents = self.documents.lock().unwrap();
        if let Some(existing) = documents.get(&dedup_key) {
            return Ok(IngestReceipt {
                document_id: existing.clone(),
                chunks_created: 0,
            });
        }
        self.index.insert(entries)?;
        documents.insert(dedup_key, doc.id.clone());

        Ok(IngestReceipt {
            document_id: doc.id,
            chunks_created,
        })
    }

    /// Answer a query for one conversation session.
    ///
    /// On an empty knowledge base this returns the fixed no-knowledge
    /// answer without calling the embedding or language model. When all
    /// retrieved chunks fall below the relevance threshold, generation
    /// still runs over conversation history alone.
    pub async fn answer_query(
        &self,
        session_id: &str,
        query_text: &str,
    ) -> Result<QueryResponse, RagError> {
        if self.index.is_empty() {
            self.sessions.append(session_id, Role::User, query_text);
            self.sessions
                .append(session_id, Role::Assistant, NO_KNOWLEDGE_ANSWER);
            return Ok(QueryResponse {
                answer: NO_KNOWLEDGE_ANSWER.to_string(),
                cited_sources: Vec::new(),
            });
        }

        // Snapshot history before this turn so the prompt does not
        // repeat the current query.
        let history = self.sessions.history(session_id);

        let retrieved = self.retriever.retrieve(query_text).await?;
        let prompt = self.assembler.assemble(&retrieved, &history, query_text);
        let synthesis = self.synthesizer.synthesize(&prompt).await?;

        // Only a fully answered turn enters the history, so a failed
        // request can be retried without a dangling user turn.
        self.sessions.append(session_id, Role::User, query_text);
        self.sessions
            .append(session_id, Role::Assistant, &synthesis.answer);

        Ok(QueryResponse {
            answer: synthesis.answer,
            cited_sources: synthesis.cited_sources,
        })
    }

    /// Live counters, derived from the index.
    pub fn get_stats(&self) -> KnowledgeBaseStats {
        self.index.stats()
    }

    /// Drop every document and chunk. Sessions are left untouched.
    pub fn clear_knowledge_base(&self) {
        // Same guard as the ingest commit, so an in-flight ingest lands
        // entirely before or entirely after the clear.
        let mut documents = self.documents.lock().unwrap();
        self.index.clear();
        documents.clear();
    }

    /// Drop one session's conversation history.
    pub fn clear_session(&self, session_id: &str) {
        self.sessions.clear(session_id);
    }
}
