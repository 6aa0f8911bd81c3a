//! Grounded prompt assembly under a hard size budget.
//!
//! The assembler packs retrieved chunks and recent conversation turns
//! into a three-section prompt:
//!
//! 1. **System instruction** — answer only from the provided context,
//!    cite sources. Kept verbatim; it is the contract anchor.
//! 2. **Context block** — chunk text with a numbered source label per
//!    chunk, best-scoring first, so the model sees background knowledge
//!    before dialogue.
//! 3. **Conversation block** — recent history in chronological order,
//!    ending with the current query.
//!
//! Budgeting rules, in priority order: chunks are packed until the
//! character budget runs out and a chunk that does not fit is dropped
//! whole (truncating a chunk risks citing a mangled source); history
//! fills whatever room remains, dropping oldest turns first. The
//! rendered prompt never exceeds `max_context_chars`.

use crate::config::ContextConfig;
use crate::retriever::ScoredChunk;
use crate::session::ChatTurn;

/// The contract anchor: instructs the model to stay inside the provided
/// context and emit `[Source N]` citations the synthesizer can parse.
pub const SYSTEM_INSTRUCTION: &str = "You are an assistant that answers questions using only the \
provided context sources. Base every statement on the numbered sources and cite them inline as \
[Source N]. If the sources do not contain the answer, say so plainly instead of guessing.";

/// A fully assembled prompt, split into the sections the LLM call needs.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    /// System instruction (always [`SYSTEM_INSTRUCTION`]).
    pub system: String,
    /// Numbered context block; empty when nothing relevant was retrieved.
    pub context: String,
    /// History plus the current query, chronological.
    pub conversation: String,
    /// Chunks that made it into the context block, in label order
    /// (`[Source 1]` is `included_chunks[0]`).
    pub included_chunks: Vec<ScoredChunk>,
}

impl AssembledPrompt {
    /// The user-role message body: context block followed by conversation.
    pub fn user_message(&self) -> String {
        if self.context.is_empty() {
            self.conversation.clone()
        } else {
            format!("{}\n\n{}", self.context, self.conversation)
        }
    }

    /// Full prompt text, used for size accounting.
    pub fn render(&self) -> String {
        format!("{}\n\n{}", self.system, self.user_message())
    }

    /// Prompt size in characters.
    pub fn char_len(&self) -> usize {
        self.render().chars().count()
    }
}

/// Packs retrieval output and history into a bounded [`AssembledPrompt`].
pub struct ContextAssembler {
    max_context_chars: usize,
    max_history_turns: usize,
}

impl ContextAssembler {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            max_context_chars: config.max_context_chars,
            max_history_turns: config.max_history_turns,
        }
    }

    /// Assemble the prompt for one query.
    ///
    /// `chunks` must arrive in descending relevance order (the
    /// retriever's output order); `history` oldest first.
    pub fn assemble(
        &self,
        chunks: &[ScoredChunk],
        history: &[ChatTurn],
        query: &str,
    ) -> AssembledPrompt {
        let query_line = format!("User: {}", query);

        // Fixed cost: system + separator + query line. Chunks and history
        // compete for what is left.
        let fixed = chars(SYSTEM_INSTRUCTION) + 2 + chars(&query_line);
        let mut remaining = self.max_context_chars.saturating_sub(fixed);

        // Context block: greedy in relevance order, whole chunks only.
        const CONTEXT_HEADER: &str = "Context sources:";
        let mut context_blocks: Vec<String> = Vec::new();
        let mut included_chunks: Vec<ScoredChunk> = Vec::new();
        for chunk in chunks {
            let block = format!(
                "[Source {}] {}\n{}",
                included_chunks.len() + 1,
                chunk.source_label(),
                chunk.entry.chunk.text
            );
            // First block also pays for the header and the section
            // separator; every block pays for its own separator.
            let cost = if context_blocks.is_empty() {
                chars(CONTEXT_HEADER) + 1 + chars(&block) + 2
            } else {
                chars(&block) + 2
            };
            if cost <= remaining {
                remaining -= cost;
                context_blocks.push(block);
                included_chunks.push(chunk.clone());
            }
            // else: dropped whole, never truncated.
        }

        // Conversation block: newest turns claim the leftover budget, so
        // the oldest are the first to go when space runs out.
        let window_start = history.len().saturating_sub(self.max_history_turns);
        let mut kept_lines: Vec<String> = Vec::new();
        for turn in history[window_start..].iter().rev() {
            let line = format!("{}: {}", turn.role.label(), turn.text);
            let cost = chars(&line) + 1;
            if cost > remaining {
                break;
            }
            remaining -= cost;
            kept_lines.push(line);
        }
        kept_lines.reverse();
        kept_lines.push(query_line);

        let context = if context_blocks.is_empty() {
            String::new()
        } else {
            format!("{}\n{}", CONTEXT_HEADER, context_blocks.join("\n\n"))
        };

        let prompt = AssembledPrompt {
            system: SYSTEM_INSTRUCTION.to_string(),
            context,
            conversation: kept_lines.join("\n"),
            included_chunks,
        };
        debug_assert!(
            prompt.char_len() <= self.max_context_chars || fixed > self.max_context_chars,
            "assembled prompt exceeds budget"
        );
        prompt
    }
}

fn chars(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexEntry;
    use crate::models::Chunk;
    use crate::session::Role;

    fn scored(doc: &str, ordinal: usize, text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            entry: IndexEntry {
                chunk: Chunk {
                    id: format!("{}-{}", doc, ordinal),
                    document_id: doc.to_string(),
                    ordinal,
                    text: text.to_string(),
                    start_char: 0,
                    end_char: text.chars().count(),
                },
                vector: Vec::new(),
                source_file: format!("{}.md", doc),
            },
            score,
        }
    }

    fn assembler(max_chars: usize, max_turns: usize) -> ContextAssembler {
        ContextAssembler::new(&ContextConfig {
            max_context_chars: max_chars,
            max_history_turns: max_turns,
        })
    }

    #[test]
    fn test_three_sections_present() {
        let chunks = vec![scored("doc", 0, "Rust enforces ownership at compile time.", 0.9)];
        let history = vec![ChatTurn::new(Role::User, "earlier question")];
        let prompt = assembler(4000, 6).assemble(&chunks, &history, "what is ownership?");

        assert_eq!(prompt.system, SYSTEM_INSTRUCTION);
        assert!(prompt.context.contains("[Source 1] doc.md (chunk 0)"));
        assert!(prompt.context.contains("Rust enforces ownership"));
        assert!(prompt.conversation.starts_with("User: earlier question"));
        assert!(prompt.conversation.ends_with("User: what is ownership?"));
        // Context precedes conversation in the user message.
        let user = prompt.user_message();
        assert!(user.find("Context sources:").unwrap() < user.find("earlier question").unwrap());
    }

    #[test]
    fn test_budget_never_exceeded() {
        let big_text = "x".repeat(300);
        let chunks: Vec<ScoredChunk> = (0..20)
            .map(|i| scored("doc", i, &big_text, 1.0 - i as f32 * 0.01))
            .collect();
        let history: Vec<ChatTurn> = (0..50)
            .map(|i| ChatTurn::new(Role::User, format!("history turn number {}", i)))
            .collect();
        for max in [400, 800, 1500, 3000, 8000] {
            let prompt = assembler(max, 50).assemble(&chunks, &history, "q");
            assert!(
                prompt.char_len() <= max,
                "budget {} exceeded: {}",
                max,
                prompt.char_len()
            );
        }
    }

    #[test]
    fn test_chunks_dropped_whole_never_truncated() {
        let fits = "short chunk".to_string();
        let too_big = "y".repeat(5000);
        let chunks = vec![
            scored("big", 0, &too_big, 0.99),
            scored("small", 0, &fits, 0.5),
        ];
        let prompt = assembler(600, 6).assemble(&chunks, &[], "q");
        // The oversized top chunk is dropped whole; the smaller,
        // lower-relevance one still fits.
        assert!(!prompt.context.contains('y'));
        assert!(prompt.context.contains("short chunk"));
        assert_eq!(prompt.included_chunks.len(), 1);
        assert_eq!(prompt.included_chunks[0].entry.chunk.document_id, "small");
    }

    #[test]
    fn test_history_bounded_and_chronological() {
        let history: Vec<ChatTurn> = (0..10)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                ChatTurn::new(role, format!("turn {}", i))
            })
            .collect();
        let prompt = assembler(8000, 4).assemble(&[], &history, "current");
        assert!(!prompt.conversation.contains("turn 5"));
        assert!(prompt.conversation.contains("turn 6"));
        assert!(prompt.conversation.contains("turn 9"));
        let pos6 = prompt.conversation.find("turn 6").unwrap();
        let pos9 = prompt.conversation.find("turn 9").unwrap();
        assert!(pos6 < pos9);
    }

    #[test]
    fn test_oldest_history_dropped_first_under_pressure() {
        let history = vec![
            ChatTurn::new(Role::User, "the very oldest turn, which is rather long indeed"),
            ChatTurn::new(Role::Assistant, "a reply"),
            ChatTurn::new(Role::User, "newest"),
        ];
        let fixed = SYSTEM_INSTRUCTION.chars().count() + 2 + "User: q".chars().count();
        // Room for the two newest turns only.
        let prompt = assembler(fixed + 40, 6).assemble(&[], &history, "q");
        assert!(!prompt.conversation.contains("very oldest"));
        assert!(prompt.conversation.contains("a reply"));
        assert!(prompt.conversation.contains("newest"));
        assert_eq!(prompt.system, SYSTEM_INSTRUCTION);
    }

    #[test]
    fn test_empty_retrieval_omits_context_section() {
        let prompt = assembler(4000, 6).assemble(&[], &[], "hello");
        assert!(prompt.context.is_empty());
        assert_eq!(prompt.user_message(), "User: hello");
        assert!(prompt.included_chunks.is_empty());
    }

    #[test]
    fn test_source_numbering_matches_included_order() {
        let chunks = vec![
            scored("a", 0, "alpha text", 0.9),
            scored("b", 1, "beta text", 0.8),
        ];
        let prompt = assembler(4000, 6).assemble(&chunks, &[], "q");
        assert!(prompt.context.contains("[Source 1] a.md (chunk 0)"));
        assert!(prompt.context.contains("[Source 2] b.md (chunk 1)"));
    }
}
