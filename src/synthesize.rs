//! Answer synthesis over the assembled prompt.
//!
//! Issues the prompt to the [`LanguageModel`] seam and turns the raw
//! completion into a [`Synthesis`]: answer text plus resolved citations.
//! The model's output is untrusted — `[Source N]` markers are parsed
//! defensively and anything that does not resolve to a chunk actually
//! present in the context block is ignored. When the model cites
//! nothing, every chunk it was shown is cited, so the caller can always
//! display where the answer could have come from.

use serde::Serialize;
use std::sync::Arc;

use crate::context::AssembledPrompt;
use crate::error::RagError;
use crate::llm::LanguageModel;

/// A resolved reference to a chunk that grounded the answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
    pub chunk_id: String,
    pub source_file: String,
    pub ordinal: usize,
}

/// The outcome of one generation call.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub answer: String,
    /// Chunks the answer is grounded in, first mention first.
    pub cited_sources: Vec<Citation>,
}

/// Wraps the LLM collaborator and resolves citations.
pub struct AnswerSynthesizer {
    model: Arc<dyn LanguageModel>,
}

impl AnswerSynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Generate a grounded answer for an assembled prompt.
    ///
    /// All LLM-side failures (provider error, timeout, empty response)
    /// surface as [`RagError::Generation`].
    pub async fn synthesize(&self, prompt: &AssembledPrompt) -> Result<Synthesis, RagError> {
        let answer = self
            .model
            .complete(&prompt.system, &prompt.user_message())
            .await?;

        if answer.trim().is_empty() {
            return Err(RagError::Generation(anyhow::anyhow!(
                "model returned an empty answer"
            )));
        }

        let marker_numbers = extract_citation_markers(&answer);
        let cited: Vec<Citation> = if marker_numbers.is_empty() {
            prompt.included_chunks.iter().map(citation_for).collect()
        } else {
            marker_numbers
                .into_iter()
                // Markers are 1-based labels into the context block.
                .filter_map(|n| prompt.included_chunks.get(n.wrapping_sub(1)))
                .map(citation_for)
                .collect()
        };

        Ok(Synthesis {
            answer,
            cited_sources: cited,
        })
    }
}

fn citation_for(chunk: &crate::retriever::ScoredChunk) -> Citation {
    Citation {
        chunk_id: chunk.entry.chunk.id.clone(),
        source_file: chunk.entry.source_file.clone(),
        ordinal: chunk.entry.chunk.ordinal,
    }
}

/// Collect the numbers of `[Source N]` markers, first mention first,
/// without duplicates. Malformed markers are skipped.
fn extract_citation_markers(text: &str) -> Vec<usize> {
    const PREFIX: &str = "[Source ";
    let mut numbers = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(PREFIX) {
        rest = &rest[pos + PREFIX.len()..];
        if let Some(close) = rest.find(']') {
            if let Ok(n) = rest[..close].trim().parse::<usize>() {
                if n > 0 && !numbers.contains(&n) {
                    numbers.push(n);
                }
            }
        }
    }
    numbers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexEntry;
    use crate::models::Chunk;
    use crate::retriever::ScoredChunk;
    use async_trait::async_trait;

    /// Stub model that replays a canned answer.
    struct CannedModel(String);

    #[async_trait]
    impl LanguageModel for CannedModel {
        fn model_name(&self) -> &str {
            "canned"
        }
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, RagError> {
            Ok(self.0.clone())
        }
    }

    fn scored(doc: &str, ordinal: usize) -> ScoredChunk {
        ScoredChunk {
            entry: IndexEntry {
                chunk: Chunk {
                    id: format!("{}-{}", doc, ordinal),
                    document_id: doc.to_string(),
                    ordinal,
                    text: format!("text of {}", doc),
                    start_char: 0,
                    end_char: 0,
                },
                vector: Vec::new(),
                source_file: format!("{}.md", doc),
            },
            score: 0.8,
        }
    }

    fn prompt_with(chunks: Vec<ScoredChunk>) -> AssembledPrompt {
        AssembledPrompt {
            system: "system".to_string(),
            context: "context".to_string(),
            conversation: "User: q".to_string(),
            included_chunks: chunks,
        }
    }

    #[test]
    fn test_extract_markers_in_order_deduped() {
        let text = "Per [Source 2], yes. [Source 1] agrees, and [Source 2] repeats it.";
        assert_eq!(extract_citation_markers(text), vec![2, 1]);
    }

    #[test]
    fn test_extract_ignores_malformed() {
        assert!(extract_citation_markers("[Source] [Source x] [Source 0]").is_empty());
        assert!(extract_citation_markers("no markers here").is_empty());
    }

    #[tokio::test]
    async fn test_cited_markers_resolve_to_chunks() {
        let synthesizer = AnswerSynthesizer::new(Arc::new(CannedModel(
            "Yes [Source 2], see also [Source 1].".to_string(),
        )));
        let prompt = prompt_with(vec![scored("a", 0), scored("b", 3)]);
        let synthesis = synthesizer.synthesize(&prompt).await.unwrap();
        assert_eq!(synthesis.cited_sources.len(), 2);
        assert_eq!(synthesis.cited_sources[0].source_file, "b.md");
        assert_eq!(synthesis.cited_sources[1].source_file, "a.md");
    }

    #[tokio::test]
    async fn test_no_markers_cites_everything_shown() {
        let synthesizer =
            AnswerSynthesizer::new(Arc::new(CannedModel("an uncited answer".to_string())));
        let prompt = prompt_with(vec![scored("a", 0), scored("b", 1)]);
        let synthesis = synthesizer.synthesize(&prompt).await.unwrap();
        assert_eq!(synthesis.cited_sources.len(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_markers_ignored() {
        let synthesizer =
            AnswerSynthesizer::new(Arc::new(CannedModel("see [Source 7]".to_string())));
        let prompt = prompt_with(vec![scored("a", 0)]);
        let synthesis = synthesizer.synthesize(&prompt).await.unwrap();
        assert!(synthesis.cited_sources.is_empty());
    }

    #[tokio::test]
    async fn test_blank_answer_is_generation_error() {
        let synthesizer = AnswerSynthesizer::new(Arc::new(CannedModel("   \n".to_string())));
        let prompt = prompt_with(vec![]);
        let err = synthesizer.synthesize(&prompt).await.unwrap_err();
        assert!(matches!(err, RagError::Generation(_)));
    }
}
