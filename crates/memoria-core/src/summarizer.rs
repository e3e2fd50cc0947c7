//! Summarizer
//!
//! Turns a run of STM turns into a single MTM `Chunk`. Two modes: `Local`
//! deterministic extractive summarization (no network calls), and `Llm`,
//! which delegates to an external summarization capability and silently
//! falls back to `Local` on any failure, per the propagation policy that
//! Summarizer failures must never surface to callers.

use std::sync::Arc;

use crate::embeddings::Embedder;
use crate::keywords::union_keywords;
use crate::mtm::{chunk_timestamp, new_chunk_id, Chunk};
use crate::stm::Turn;

/// High-signal intents that weigh into a chunk's importance heuristic.
const HIGH_SIGNAL_INTENTS: &[&str] = &["debug", "commit_log"];

/// An external summarization capability (e.g. an LLM call). Implementors
/// may fail; the Summarizer falls back to `Local` mode when they do.
pub trait LlmSummarize: Send + Sync {
    /// Produce a concise summary of the given turns' contents.
    fn summarize(&self, turns: &[Turn]) -> Result<String, String>;
}

/// Which summarization strategy a `Summarizer` uses.
pub enum Mode {
    /// Deterministic extractive summarization: first + last turn, entity
    /// union, intent union. No network calls.
    Local,
    /// Delegate to an external LLM-summarize capability, falling back to
    /// `Local` silently on failure.
    Llm(Arc<dyn LlmSummarize>),
}

/// Produces MTM chunks from groups of STM turns.
pub struct Summarizer {
    mode: Mode,
    embedder: Arc<dyn Embedder>,
}

impl Summarizer {
    /// Build a summarizer in `Local` mode.
    pub fn local(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            mode: Mode::Local,
            embedder,
        }
    }

    /// Build a summarizer delegating to `llm`, with silent fallback to
    /// `Local` mode.
    pub fn llm(llm: Arc<dyn LlmSummarize>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            mode: Mode::Llm(llm),
            embedder,
        }
    }

    /// Summarize `turns` (typically the most recent `summarize_every`
    /// turns) into a single chunk.
    pub fn summarize(&self, turns: &[Turn]) -> Chunk {
        let summary = match &self.mode {
            Mode::Local => Self::local_summary(turns),
            Mode::Llm(llm) => llm.summarize(turns).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "llm summarize failed, falling back to local");
                Self::local_summary(turns)
            }),
        };

        let topics = union_keywords(turns.iter().map(|t| t.content.as_str()));
        let embedding = self.embedder.embed(&summary).ok();
        let importance = Self::importance(turns);

        Chunk {
            id: new_chunk_id(),
            summary,
            source_turn_ids: turns.iter().map(|t| t.id.clone()).collect(),
            topics,
            embedding,
            importance,
            message_count: turns.len(),
            created_at: chunk_timestamp(),
            graph_mirror_id: None,
        }
    }

    fn local_summary(turns: &[Turn]) -> String {
        if turns.is_empty() {
            return String::new();
        }
        if turns.len() == 1 {
            return turns[0].content.clone();
        }
        let first = &turns[0];
        let last = &turns[turns.len() - 1];
        format!("{} ... {}", first.content, last.content)
    }

    /// Heuristic importance in `[0, 1]`: a documented linear combination of
    /// average token count (normalized against a 200-token ceiling) and the
    /// fraction of turns carrying a high-signal intent.
    fn importance(turns: &[Turn]) -> f32 {
        if turns.is_empty() {
            return 0.0;
        }
        const TOKEN_CEILING: f32 = 200.0;
        const TOKEN_WEIGHT: f32 = 0.5;
        const INTENT_WEIGHT: f32 = 0.5;

        let avg_tokens =
            turns.iter().map(|t| t.token_estimate as f32).sum::<f32>() / turns.len() as f32;
        let token_component = (avg_tokens / TOKEN_CEILING).min(1.0);

        let high_signal_count = turns
            .iter()
            .filter(|t| {
                t.intent
                    .as_deref()
                    .is_some_and(|i| HIGH_SIGNAL_INTENTS.contains(&i))
            })
            .count();
        let intent_component = high_signal_count as f32 / turns.len() as f32;

        (TOKEN_WEIGHT * token_component + INTENT_WEIGHT * intent_component).clamp(0.0, 1.0)
    }
}
