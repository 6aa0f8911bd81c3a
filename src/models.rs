//! Core data models used throughout the pipeline.
//!
//! These types represent the documents and chunks that flow through the
//! ingestion and retrieval pipeline. Documents and their chunks are
//! created together on ingest and never mutated afterwards; the only way
//! to remove them is clearing the whole knowledge base.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::RagError;

/// Source format of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Pdf,
    Txt,
    Md,
}

impl SourceType {
    /// Parse a source type label (`"pdf"`, `"txt"`, `"md"`) or a file
    /// extension (`".md"`), case-insensitively.
    ///
    /// Anything outside the supported set is an
    /// [`UnsupportedFormat`](RagError::UnsupportedFormat) error.
    pub fn parse(label: &str) -> Result<Self, RagError> {
        match label.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Ok(SourceType::Pdf),
            "txt" => Ok(SourceType::Txt),
            "md" | "markdown" => Ok(SourceType::Md),
            other => Err(RagError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Canonical lowercase label; the inverse of [`parse`](Self::parse).
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Pdf => "pdf",
            SourceType::Txt => "txt",
            SourceType::Md => "md",
        }
    }

    /// Infer the source type from a filename's extension.
    pub fn from_filename(filename: &str) -> Result<Self, RagError> {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .ok_or_else(|| RagError::UnsupportedFormat(filename.to_string()))?;
        Self::parse(ext)
    }
}

/// An ingested document. Immutable once created.
#[derive(Debug, Clone)]
pub struct Document {
    /// Document UUID.
    pub id: String,
    /// Original filename as uploaded.
    pub filename: String,
    pub source_type: SourceType,
    /// Full raw text (produced by the format-parsing collaborator).
    pub text: String,
    pub uploaded_at: DateTime<Utc>,
    /// SHA-256 of the text, used to detect duplicate uploads.
    pub content_hash: String,
}

impl Document {
    pub fn new(filename: &str, text: String, source_type: SourceType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            source_type,
            content_hash: content_hash(&text),
            text,
            uploaded_at: Utc::now(),
        }
    }
}

/// SHA-256 hex digest of a document body.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A contiguous slice of a document used as the retrieval unit.
///
/// Offsets are *character* offsets into the source text, not byte
/// offsets, so they line up with the chunker's character-window
/// arithmetic regardless of multi-byte content.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Chunk UUID.
    pub id: String,
    /// Parent document UUID.
    pub document_id: String,
    /// Position within the document: `0, 1, 2, …`.
    pub ordinal: usize,
    pub text: String,
    /// Inclusive character offset of the first character.
    pub start_char: usize,
    /// Exclusive character offset past the last character.
    pub end_char: usize,
}

/// Knowledge base counters, derived from live index state on every call
/// so they can never drift from what is actually searchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KnowledgeBaseStats {
    pub document_count: usize,
    pub chunk_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_parse() {
        assert_eq!(SourceType::parse("pdf").unwrap(), SourceType::Pdf);
        assert_eq!(SourceType::parse(".TXT").unwrap(), SourceType::Txt);
        assert_eq!(SourceType::parse("markdown").unwrap(), SourceType::Md);
        assert!(matches!(
            SourceType::parse("docx"),
            Err(RagError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_source_type_from_filename() {
        assert_eq!(
            SourceType::from_filename("notes/report.md").unwrap(),
            SourceType::Md
        );
        assert!(SourceType::from_filename("no_extension").is_err());
        assert!(SourceType::from_filename("archive.zip").is_err());
    }

    #[test]
    fn test_as_str_round_trips_through_parse() {
        for st in [SourceType::Pdf, SourceType::Txt, SourceType::Md] {
            assert_eq!(SourceType::parse(st.as_str()).unwrap(), st);
        }
    }

    #[test]
    fn test_content_hash_stable() {
        assert_eq!(content_hash("hello"), content_hash("hello"));
        assert_ne!(content_hash("hello"), content_hash("hello "));
    }
}
