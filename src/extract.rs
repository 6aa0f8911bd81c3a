//! File loading for the CLI: plain text, Markdown, and PDF.
//!
//! The core pipeline only ever sees extracted text; this module is the
//! thin collaborator that produces it from files on disk. PDF text
//! comes from `pdf-extract`; `.txt` and `.md` are read as UTF-8.
//! Directories are walked recursively and unsupported files are
//! silently skipped so a docs folder can be pointed at wholesale.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::models::SourceType;

/// A file loaded and ready for ingestion.
#[derive(Debug)]
pub struct LoadedDocument {
    pub filename: String,
    pub text: String,
    pub source_type: SourceType,
}

/// Load one supported file from disk.
pub fn load_file(path: &Path) -> Result<LoadedDocument> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("invalid filename: {}", path.display()))?
        .to_string();

    let source_type = SourceType::from_filename(&filename)?;

    let text = match source_type {
        SourceType::Pdf => pdf_extract::extract_text(path)
            .with_context(|| format!("failed to extract text from {}", path.display()))?,
        SourceType::Txt | SourceType::Md => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
    };

    Ok(LoadedDocument {
        filename,
        text,
        source_type,
    })
}

/// Expand a path into the supported files beneath it.
///
/// A supported file maps to itself; a directory is walked recursively.
/// Results are sorted for deterministic ingest order.
pub fn collect_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| SourceType::from_filename(n).is_ok())
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}
