//! Fixed-size overlapping text chunker.
//!
//! Splits document body text into [`Chunk`]s of at most `chunk_size`
//! characters, with consecutive chunks sharing `overlap` characters.
//! Overlap keeps sentences that straddle a boundary retrievable from
//! both sides of it.
//!
//! # Algorithm
//!
//! 1. Walk the text in steps of `chunk_size - overlap` characters.
//! 2. At each step emit a chunk covering up to `chunk_size` characters.
//! 3. Stop once a chunk reaches the end of the text.
//!
//! All arithmetic is in characters, never bytes, so multi-byte UTF-8
//! content cannot split a code point. The split is fully deterministic:
//! identical input text and parameters always produce byte-identical
//! chunk boundaries, which both retrieval reproducibility and the test
//! suite rely on.
//!
//! # Example
//!
//! ```rust
//! use ragmill::chunker::split_document;
//!
//! let chunks = split_document("doc-123", "hello world", 500, 50).unwrap();
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].text, "hello world");
//! ```

use uuid::Uuid;

use crate::error::RagError;
use crate::models::Chunk;

/// Split text into overlapping fixed-size character windows.
///
/// # Arguments
///
/// * `document_id` — The parent document's UUID (recorded on each chunk).
/// * `text` — The full document body.
/// * `chunk_size` — Maximum characters per chunk.
/// * `overlap` — Characters shared between consecutive chunks.
///
/// # Guarantees
///
/// - `0 ≤ overlap < chunk_size`, otherwise [`RagError::Configuration`].
/// - Text shorter than `chunk_size` produces exactly one chunk spanning
///   the whole text; empty text produces one empty chunk.
/// - Chunk ordinals are contiguous: `0, 1, 2, …, N-1`.
/// - Every chunk except possibly the last spans exactly `chunk_size`
///   characters; `chunk.end_char - chunk.start_char == text len` of the
///   chunk in characters.
pub fn split_document(
    document_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, RagError> {
    if chunk_size == 0 {
        return Err(RagError::Configuration(
            "chunk_size must be > 0".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(RagError::Configuration(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            overlap, chunk_size
        )));
    }

    // Byte offset of every character boundary, including the final one,
    // so char-window [start, end) maps to a valid &str slice.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    let total_chars = boundaries.len() - 1;

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let end = (start + chunk_size).min(total_chars);
        let slice = &text[boundaries[start]..boundaries[end]];
        chunks.push(make_chunk(document_id, chunks.len(), slice, start, end));
        if end == total_chars {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

fn make_chunk(document_id: &str, ordinal: usize, text: &str, start: usize, end: usize) -> Chunk {
    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        ordinal,
        text: text.to_string(),
        start_char: start,
        end_char: end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(chunks: &[Chunk]) -> Vec<(usize, usize)> {
        chunks.iter().map(|c| (c.start_char, c.end_char)).collect()
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = split_document("doc1", "Hello, world!", 500, 50).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].ordinal, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(offsets(&chunks), vec![(0, 13)]);
    }

    #[test]
    fn test_empty_text() {
        let chunks = split_document("doc1", "", 500, 50).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "");
        assert_eq!(offsets(&chunks), vec![(0, 0)]);
    }

    #[test]
    fn test_1200_chars_three_overlapping_windows() {
        // 1200 chars, size 500, overlap 50 → [0,500), [450,950), [900,1200).
        let text: String = std::iter::repeat("abcdefghij").take(120).collect();
        assert_eq!(text.chars().count(), 1200);
        let chunks = split_document("doc1", &text, 500, 50).unwrap();
        assert_eq!(offsets(&chunks), vec![(0, 500), (450, 950), (900, 1200)]);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.ordinal, i);
        }
    }

    #[test]
    fn test_exact_fit_no_trailing_chunk() {
        let text: String = std::iter::repeat('x').take(500).collect();
        let chunks = split_document("doc1", &text, 500, 50).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(offsets(&chunks), vec![(0, 500)]);
    }

    #[test]
    fn test_overlap_regions_identical() {
        let text: String = (0..260).map(|i| ((b'a' + (i % 26) as u8) as char)).collect();
        let chunks = split_document("doc1", &text, 100, 20).unwrap();
        for pair in chunks.windows(2) {
            let prev_tail: String = pair[0].text.chars().rev().take(20).collect::<Vec<_>>()
                .into_iter().rev().collect();
            let next_head: String = pair[1].text.chars().take(20).collect();
            assert_eq!(prev_tail, next_head);
        }
    }

    #[test]
    fn test_zero_overlap() {
        let text: String = std::iter::repeat('y').take(250).collect();
        let chunks = split_document("doc1", &text, 100, 0).unwrap();
        assert_eq!(offsets(&chunks), vec![(0, 100), (100, 200), (200, 250)]);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            split_document("doc1", "text", 0, 0),
            Err(RagError::Configuration(_))
        ));
        assert!(matches!(
            split_document("doc1", "text", 100, 100),
            Err(RagError::Configuration(_))
        ));
        assert!(matches!(
            split_document("doc1", "text", 100, 150),
            Err(RagError::Configuration(_))
        ));
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let text: String = std::iter::repeat('é').take(120).collect();
        let chunks = split_document("doc1", &text, 50, 10).unwrap();
        assert_eq!(chunks[0].text.chars().count(), 50);
        // Character offsets, not byte offsets.
        assert_eq!(chunks[0].end_char, 50);
        let reassembled_last = chunks.last().unwrap();
        assert_eq!(reassembled_last.end_char, 120);
    }

    #[test]
    fn test_deterministic() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
        let a = split_document("doc1", &text, 120, 30).unwrap();
        let b = split_document("doc1", &text, 120, 30).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.text, y.text);
            assert_eq!((x.start_char, x.end_char), (y.start_char, y.end_char));
            assert_eq!(x.ordinal, y.ordinal);
        }
    }
}
