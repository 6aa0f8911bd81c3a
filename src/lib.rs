//! # Ragmill
//!
//! A retrieval-augmented document question-answering engine.
//!
//! Ragmill ingests documents (txt, md, pdf), splits them into
//! overlapping chunks, embeds and indexes them in memory, and answers
//! natural-language questions grounded only in the uploaded content —
//! retrieved chunks are packed into a bounded prompt alongside recent
//! conversation turns and sent to an external LLM, whose answer comes
//! back with citations into the source chunks.
//!
//! ## Architecture
//!
//! ```text
//! Upload ──▶ Chunker ──▶ Embedder ──▶ VectorIndex
//!
//! Query ──▶ Retriever ──▶ ContextAssembler ──▶ AnswerSynthesizer
//!             │   ▲              ▲                    │
//!             ▼   │              │                    ▼
//!         VectorIndex     ConversationHistory   answer + citations
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunker`] | Fixed-size overlapping text chunking |
//! | [`index`] | In-memory cosine-similarity vector index |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`llm`] | Language model abstraction |
//! | [`retriever`] | Top-k retrieval with relevance threshold |
//! | [`context`] | Bounded grounded prompt assembly |
//! | [`synthesize`] | Answer generation and citation resolution |
//! | [`session`] | Bounded per-session conversation history |
//! | [`knowledge`] | Knowledge base orchestration |
//! | [`extract`] | File loading (txt, md, pdf) |
//! | [`server`] | JSON HTTP API |

pub mod chunker;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod knowledge;
pub mod llm;
pub mod models;
pub mod retriever;
pub mod server;
pub mod session;
pub mod synthesize;
