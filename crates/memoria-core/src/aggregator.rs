//! Aggregator
//!
//! Merges the three tiers' parallel result lists into a single ranked list:
//! per-item `base_score` (tier-specific), `relevance_score` (cosine against
//! the query embedding), a weighted `final_score`, then Jaccard-based
//! dedup against higher-scored items.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::embeddings::cosine_similarity;
use crate::hybrid_ltm::HybridItem;
use crate::mtm::ScoredChunk;
use crate::stm::ScoredTurn;

/// Which tier an aggregated item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Short-term memory.
    Stm,
    /// Mid-term memory.
    Mtm,
    /// Long-term memory.
    Ltm,
}

/// Per-tier weights used to compute `final_score`. Defaults: 0.5/0.3/0.2.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Weights {
    /// Weight applied to STM items.
    pub stm: f32,
    /// Weight applied to MTM items.
    pub mtm: f32,
    /// Weight applied to LTM items.
    pub ltm: f32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            stm: 0.5,
            mtm: 0.3,
            ltm: 0.2,
        }
    }
}

/// A single aggregated, ranked item.
#[derive(Debug, Clone)]
pub struct AggregatedItem {
    /// Which tier this item came from.
    pub source: Source,
    /// Display content.
    pub content: String,
    /// Tier-specific base score before the relevance blend.
    pub base_score: f32,
    /// Cosine relevance against the query embedding, 0.0 if unavailable.
    pub relevance_score: f32,
    /// `w_layer * (alpha * relevance_score + (1 - alpha) * base_score)`.
    pub final_score: f32,
    /// Arbitrary metadata carried through from the source item.
    pub metadata: serde_json::Value,
    /// Embedding, retained for downstream MMR compression.
    pub embedding: Option<Vec<f32>>,
    /// When the source item was created (STM turn / MTM chunk). LTM items
    /// carry no creation timestamp of their own, so this is set to the
    /// aggregation time for them; "most recent" selection downstream only
    /// ever applies to STM items, where this field is meaningful.
    pub created_at: DateTime<Utc>,
}

/// Aggregates per-tier result lists into a single ranked list.
pub struct Aggregator {
    weights: Weights,
    alpha: f32,
    dedup_threshold: f32,
}

impl Aggregator {
    /// Build an aggregator with the given weights, relevance/base mix `alpha`,
    /// and Jaccard dedup threshold.
    pub fn new(weights: Weights, alpha: f32, dedup_threshold: f32) -> Self {
        Self {
            weights,
            alpha,
            dedup_threshold,
        }
    }

    /// Aggregate the three tiers' results into a single list, sorted
    /// strictly non-increasing by `final_score`, deduplicated.
    pub fn aggregate(
        &self,
        stm: &[ScoredTurn],
        mtm: &[ScoredChunk],
        ltm: &[HybridItem],
        query_embedding: Option<&[f32]>,
    ) -> Vec<AggregatedItem> {
        let mut items = Vec::with_capacity(stm.len() + mtm.len() + ltm.len());
        items.extend(self.score_stm(stm, query_embedding));
        items.extend(self.score_mtm(mtm, query_embedding));
        items.extend(self.score_ltm(ltm, query_embedding));

        items.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        self.dedup(items)
    }

    fn score_stm(&self, stm: &[ScoredTurn], query_embedding: Option<&[f32]>) -> Vec<AggregatedItem> {
        let now = Utc::now();
        stm.iter()
            .map(|scored| {
                let base_score = recency_decay(scored.turn.created_at, now);
                let relevance_score = relevance(query_embedding, scored.turn.embedding.as_deref());
                AggregatedItem {
                    source: Source::Stm,
                    content: scored.turn.content.clone(),
                    base_score,
                    relevance_score,
                    final_score: self.weights.stm * self.blend(relevance_score, base_score),
                    metadata: serde_json::json!({ "turn_id": scored.turn.id, "role": scored.turn.role }),
                    embedding: scored.turn.embedding.clone(),
                    created_at: scored.turn.created_at,
                }
            })
            .collect()
    }

    fn score_mtm(&self, mtm: &[ScoredChunk], query_embedding: Option<&[f32]>) -> Vec<AggregatedItem> {
        mtm.iter()
            .enumerate()
            .map(|(position, scored)| {
                let base_score = position_score(position, mtm.len());
                let relevance_score = relevance(query_embedding, scored.chunk.embedding.as_deref());
                AggregatedItem {
                    source: Source::Mtm,
                    content: scored.chunk.summary.clone(),
                    base_score,
                    relevance_score,
                    final_score: self.weights.mtm * self.blend(relevance_score, base_score),
                    metadata: serde_json::json!({ "chunk_id": scored.chunk.id, "topics": scored.chunk.topics }),
                    embedding: scored.chunk.embedding.clone(),
                    created_at: scored.chunk.created_at,
                }
            })
            .collect()
    }

    fn score_ltm(&self, ltm: &[HybridItem], _query_embedding: Option<&[f32]>) -> Vec<AggregatedItem> {
        // A vector-store hit's score already *is* the cosine similarity
        // against the query, so it serves directly as `relevance_score`;
        // graph-only hits (no vector_score) score 0 relevance.
        ltm.iter()
            .map(|item| {
                let base_score = item
                    .metadata
                    .get("importance")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.5) as f32;
                let relevance_score = item.vector_score.unwrap_or(0.0);
                AggregatedItem {
                    source: Source::Ltm,
                    content: item.content.clone().unwrap_or_default(),
                    base_score,
                    relevance_score,
                    final_score: self.weights.ltm * self.blend(relevance_score, base_score),
                    metadata: item.metadata.clone(),
                    embedding: None,
                    created_at: Utc::now(),
                }
            })
            .collect()
    }

    fn blend(&self, relevance_score: f32, base_score: f32) -> f32 {
        self.alpha * relevance_score + (1.0 - self.alpha) * base_score
    }

    fn dedup(&self, items: Vec<AggregatedItem>) -> Vec<AggregatedItem> {
        let mut kept: Vec<AggregatedItem> = Vec::with_capacity(items.len());
        let mut kept_tokens: Vec<HashSet<String>> = Vec::with_capacity(items.len());

        for item in items {
            let tokens = tokenize(&item.content);
            let is_duplicate = kept_tokens
                .iter()
                .any(|existing| jaccard(existing, &tokens) > self.dedup_threshold);
            if !is_duplicate {
                kept_tokens.push(tokens);
                kept.push(item);
            }
        }
        kept
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|s| s.to_string())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

fn relevance(query_embedding: Option<&[f32]>, item_embedding: Option<&[f32]>) -> f32 {
    match (query_embedding, item_embedding) {
        (Some(q), Some(e)) => cosine_similarity(q, e),
        _ => 0.0,
    }
}

/// Exponential recency decay: score 1.0 at `now`, halving every hour.
fn recency_decay(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
    let age_seconds = (now - created_at).num_seconds().max(0) as f32;
    const HALF_LIFE_SECONDS: f32 = 3600.0;
    0.5f32.powf(age_seconds / HALF_LIFE_SECONDS)
}

/// Position-based base score for MTM chunks: most recently-appended scores
/// highest, linearly down to the oldest.
fn position_score(position: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }
    position as f32 / (len - 1) as f32
}
