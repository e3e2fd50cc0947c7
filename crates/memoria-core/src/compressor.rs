//! Compressor
//!
//! Reduces an aggregated, ranked item list to fit a token budget under one
//! of three strategies: `truncate` (input order), `score_based` (by
//! `final_score`, with an optional preserve-recent override), or `mmr`
//! (diversity-aware selection).

use crate::aggregator::{AggregatedItem, Source};
use crate::embeddings::cosine_similarity;

/// Which compression strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Accept items in input order while under budget.
    Truncate,
    /// Accept items sorted by `final_score`, optionally preserving the most
    /// recent STM items.
    ScoreBased,
    /// Maximal Marginal Relevance: trade off score against redundancy with
    /// already-accepted items.
    Mmr,
}

/// Result of a `Compressor::compress` call.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    /// The items that survived compression, in output order.
    pub compressed_items: Vec<AggregatedItem>,
    /// Total estimated tokens of `compressed_items`.
    pub total_tokens: usize,
    /// Estimated tokens of the full input list.
    pub original_tokens: usize,
    /// `total_tokens / original_tokens`, 0.0 when `original_tokens == 0`.
    pub compression_ratio: f32,
    /// Strategy used.
    pub strategy: Strategy,
    /// Number of items kept.
    pub items_kept: usize,
    /// Number of items dropped.
    pub items_removed: usize,
    /// Set when a single item alone exceeded the budget and was truncated
    /// to a budget-sized prefix.
    pub truncated: bool,
}

/// `chars/4`, rounded up — the default token estimator. Callers may inject
/// a better one via `compress_with_estimator`.
pub fn default_token_estimate(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Reduces ranked item lists to fit a token budget.
pub struct Compressor {
    mmr_lambda: f32,
}

impl Compressor {
    /// Build a compressor with the given MMR trade-off `lambda`.
    pub fn new(mmr_lambda: f32) -> Self {
        Self { mmr_lambda }
    }

    /// Compress `items` under `max_tokens`, using `strategy`. When
    /// `preserve_recent` is set and `strategy` is `ScoreBased`, the
    /// `preserve_recent_n` most-recent STM items (by `created_at`, not by
    /// array position — the Aggregator sorts the input by `final_score`
    /// across all tiers, so position carries no recency information) are
    /// forcibly kept, displacing the lowest-scored non-preserved item if
    /// necessary.
    pub fn compress(
        &self,
        items: &[AggregatedItem],
        max_tokens: usize,
        strategy: Strategy,
        preserve_recent: bool,
        preserve_recent_n: usize,
    ) -> CompressionResult {
        self.compress_with_estimator(
            items,
            max_tokens,
            strategy,
            preserve_recent,
            preserve_recent_n,
            default_token_estimate,
        )
    }

    /// Same as `compress`, with a caller-supplied token estimator.
    pub fn compress_with_estimator(
        &self,
        items: &[AggregatedItem],
        max_tokens: usize,
        strategy: Strategy,
        preserve_recent: bool,
        preserve_recent_n: usize,
        estimate: impl Fn(&str) -> usize,
    ) -> CompressionResult {
        let original_tokens: usize = items.iter().map(|i| estimate(&i.content)).sum();

        if max_tokens == 0 {
            return CompressionResult {
                compressed_items: Vec::new(),
                total_tokens: 0,
                original_tokens,
                compression_ratio: 0.0,
                strategy,
                items_kept: 0,
                items_removed: items.len(),
                truncated: false,
            };
        }

        let (mut kept, mut truncated) = match strategy {
            Strategy::Truncate => self.truncate(items, max_tokens, &estimate),
            Strategy::ScoreBased => {
                self.score_based(items, max_tokens, preserve_recent, preserve_recent_n, &estimate)
            }
            Strategy::Mmr => self.mmr(items, max_tokens, &estimate),
        };

        // A single item exceeding the budget alone is truncated to a
        // budget-sized prefix rather than dropped entirely.
        if kept.is_empty() {
            if let Some(first) = items.first() {
                if estimate(&first.content) > max_tokens {
                    let mut clipped = first.clone();
                    let max_chars = max_tokens.saturating_mul(4);
                    clipped.content.truncate(max_chars);
                    kept.push(clipped);
                    truncated = true;
                }
            }
        }

        let total_tokens: usize = kept.iter().map(|i| estimate(&i.content)).sum();
        let compression_ratio = if original_tokens == 0 {
            0.0
        } else {
            total_tokens as f32 / original_tokens as f32
        };

        CompressionResult {
            items_kept: kept.len(),
            items_removed: items.len() - kept.len().min(items.len()),
            compressed_items: kept,
            total_tokens,
            original_tokens,
            compression_ratio,
            strategy,
            truncated,
        }
    }

    fn truncate(
        &self,
        items: &[AggregatedItem],
        max_tokens: usize,
        estimate: &impl Fn(&str) -> usize,
    ) -> (Vec<AggregatedItem>, bool) {
        let mut kept = Vec::new();
        let mut used = 0usize;
        for item in items {
            let tokens = estimate(&item.content);
            if used + tokens > max_tokens {
                continue;
            }
            used += tokens;
            kept.push(item.clone());
        }
        (kept, false)
    }

    fn score_based(
        &self,
        items: &[AggregatedItem],
        max_tokens: usize,
        preserve_recent: bool,
        preserve_recent_n: usize,
        estimate: &impl Fn(&str) -> usize,
    ) -> (Vec<AggregatedItem>, bool) {
        let mut order: Vec<usize> = (0..items.len()).collect();
        order.sort_by(|&a, &b| {
            items[b]
                .final_score
                .partial_cmp(&items[a].final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut kept_idx: Vec<usize> = Vec::new();
        let mut used = 0usize;
        for &idx in &order {
            let tokens = estimate(&items[idx].content);
            if used + tokens > max_tokens {
                continue;
            }
            used += tokens;
            kept_idx.push(idx);
        }

        if preserve_recent {
            let mut stm_by_recency: Vec<usize> = items
                .iter()
                .enumerate()
                .filter(|(_, i)| i.source == Source::Stm)
                .map(|(idx, _)| idx)
                .collect();
            stm_by_recency.sort_by(|&a, &b| items[b].created_at.cmp(&items[a].created_at));
            let recent_idx: Vec<usize> = stm_by_recency.into_iter().take(preserve_recent_n).collect();

            for &idx in &recent_idx {
                if kept_idx.contains(&idx) {
                    continue;
                }
                used += estimate(&items[idx].content);
                kept_idx.push(idx);

                while used > max_tokens {
                    // Evict the lowest-scored kept item that is not itself a
                    // forcibly-preserved recent item.
                    let evict = kept_idx
                        .iter()
                        .copied()
                        .filter(|i| !recent_idx.contains(i))
                        .min_by(|&a, &b| {
                            items[a]
                                .final_score
                                .partial_cmp(&items[b].final_score)
                                .unwrap_or(std::cmp::Ordering::Equal)
                        });
                    let Some(evict) = evict else { break };
                    used = used.saturating_sub(estimate(&items[evict].content));
                    kept_idx.retain(|&i| i != evict);
                }
            }
        }

        // Preserve score-descending order in the final list (the recency
        // overrides are appended above; sort once more by original rank).
        kept_idx.sort_by(|&a, &b| {
            items[b]
                .final_score
                .partial_cmp(&items[a].final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        (kept_idx.into_iter().map(|idx| items[idx].clone()).collect(), false)
    }

    fn mmr(
        &self,
        items: &[AggregatedItem],
        max_tokens: usize,
        estimate: &impl Fn(&str) -> usize,
    ) -> (Vec<AggregatedItem>, bool) {
        let mut remaining: Vec<&AggregatedItem> = items.iter().collect();
        let mut kept: Vec<AggregatedItem> = Vec::new();
        let mut used = 0usize;

        while !remaining.is_empty() {
            let mut best_idx = 0;
            let mut best_value = f32::NEG_INFINITY;

            for (idx, candidate) in remaining.iter().enumerate() {
                let redundancy = kept
                    .iter()
                    .filter_map(|k| match (candidate.embedding.as_deref(), k.embedding.as_deref()) {
                        (Some(a), Some(b)) => Some(cosine_similarity(a, b)),
                        _ => None,
                    })
                    .fold(0.0f32, f32::max);

                let value = self.mmr_lambda * candidate.final_score - (1.0 - self.mmr_lambda) * redundancy;
                if value > best_value {
                    best_value = value;
                    best_idx = idx;
                }
            }

            let candidate = remaining.remove(best_idx);
            let tokens = estimate(&candidate.content);
            if used + tokens > max_tokens {
                continue;
            }
            used += tokens;
            kept.push(candidate.clone());
        }

        (kept, false)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::aggregator::{Aggregator, Weights};
    use crate::mtm::{Chunk, ScoredChunk};
    use crate::stm::{Role, ScoredTurn, Turn};

    fn item(source: Source, content: &str, score: f32) -> AggregatedItem {
        item_at(source, content, score, Utc::now())
    }

    fn item_at(source: Source, content: &str, score: f32, created_at: chrono::DateTime<Utc>) -> AggregatedItem {
        AggregatedItem {
            source,
            content: content.to_string(),
            base_score: score,
            relevance_score: score,
            final_score: score,
            metadata: serde_json::json!({}),
            embedding: None,
            created_at,
        }
    }

    #[test]
    fn max_tokens_zero_yields_empty_result() {
        let compressor = Compressor::new(0.7);
        let items = vec![item(Source::Stm, "hello world", 1.0)];
        let result = compressor.compress(&items, 0, Strategy::Truncate, false, 0);
        assert!(result.compressed_items.is_empty());
        assert_eq!(result.compression_ratio, 0.0);
    }

    #[test]
    fn total_tokens_respects_budget() {
        let compressor = Compressor::new(0.7);
        let items: Vec<_> = (0..8)
            .map(|i| item(Source::Mtm, &"x".repeat(400), 1.0 - i as f32 * 0.1))
            .collect();
        let result = compressor.compress(&items, 500, Strategy::ScoreBased, false, 0);
        assert!(result.total_tokens <= 500);
    }

    #[test]
    fn single_oversized_item_is_truncated_and_flagged() {
        let compressor = Compressor::new(0.7);
        let items = vec![item(Source::Ltm, &"y".repeat(10_000), 1.0)];
        let result = compressor.compress(&items, 10, Strategy::Truncate, false, 0);
        assert!(result.truncated);
        assert_eq!(result.compressed_items.len(), 1);
        assert!(result.total_tokens <= 10);
    }

    #[test]
    fn score_based_with_preserve_recent_keeps_most_recent_stm() {
        let compressor = Compressor::new(0.7);
        let mut items: Vec<AggregatedItem> = (0..6)
            .map(|i| item(Source::Mtm, &"a".repeat(400), 0.9 - i as f32 * 0.01))
            .collect();
        items.push(item(Source::Stm, &"b".repeat(400), 0.01));
        items.push(item(Source::Stm, &"c".repeat(400), 0.01));

        let result = compressor.compress(&items, 500, Strategy::ScoreBased, true, 2);
        let stm_kept = result
            .compressed_items
            .iter()
            .filter(|i| i.source == Source::Stm)
            .count();
        assert_eq!(stm_kept, 2);
    }

    /// `created_at`, not array position, decides "most recent" — build the
    /// array so the chronologically newest STM item sits first (where the
    /// old position-based selection would have picked it last, or not at all).
    #[test]
    fn preserve_recent_selects_by_timestamp_not_array_position() {
        let compressor = Compressor::new(0.7);
        let now = Utc::now();

        let mut items = vec![item_at(Source::Stm, &"newest ".repeat(60), 0.01, now)];
        items.extend((0..6).map(|i| item(Source::Mtm, &"a".repeat(400), 0.9 - i as f32 * 0.01)));
        items.push(item_at(
            Source::Stm,
            &"oldest ".repeat(60),
            0.01,
            now - chrono::Duration::hours(1),
        ));

        let result = compressor.compress(&items, 500, Strategy::ScoreBased, true, 1);
        let stm_kept: Vec<_> = result.compressed_items.iter().filter(|i| i.source == Source::Stm).collect();
        assert_eq!(stm_kept.len(), 1);
        assert!(stm_kept[0].content.starts_with("newest"));
    }

    /// End-to-end through the real `Aggregator`: a recent-but-low-scored STM
    /// turn must still survive compression once `final_score`-sorting has
    /// scrambled its position in the aggregated list.
    #[test]
    fn preserve_recent_survives_aggregator_score_sort() {
        let aggregator = Aggregator::new(Weights::default(), 0.7, 0.85);
        let compressor = Compressor::new(0.7);
        let now = Utc::now();

        // Decayed enough that plain score_based selection drops it for
        // budget before preserve_recent forces it back in.
        let stm = vec![ScoredTurn {
            turn: Turn {
                id: "recent-low-score".to_string(),
                role: Role::User,
                content: "recent turn".to_string(),
                embedding: None,
                intent: None,
                keywords: vec![],
                created_at: now - chrono::Duration::hours(5),
                token_estimate: 1,
            },
            similarity: 0.0,
        }];

        let mtm: Vec<ScoredChunk> = (0..6)
            .map(|i| ScoredChunk {
                chunk: Chunk {
                    id: format!("c{i}"),
                    summary: "a".repeat(400),
                    source_turn_ids: vec![],
                    topics: vec![],
                    embedding: None,
                    importance: 1.0,
                    message_count: 1,
                    created_at: now,
                    graph_mirror_id: None,
                },
                score: 0.0,
            })
            .collect();

        let aggregated = aggregator.aggregate(&stm, &mtm, &[], None);
        // The STM turn has no embedding/relevance and a high-entropy base
        // score, so it sorts well below the MTM filler on final_score.
        let stm_position = aggregated.iter().position(|i| i.source == Source::Stm).unwrap();
        assert!(stm_position > 0, "STM item should not lead the score-sorted list");

        let result = compressor.compress(&aggregated, 500, Strategy::ScoreBased, true, 1);
        assert!(result.compressed_items.iter().any(|i| i.source == Source::Stm));
    }

    #[test]
    fn truncate_strategy_preserves_input_order() {
        let compressor = Compressor::new(0.7);
        let items = vec![
            item(Source::Stm, &"a".repeat(40), 0.1),
            item(Source::Mtm, &"b".repeat(40), 0.9),
        ];
        let result = compressor.compress(&items, 100, Strategy::Truncate, false, 0);
        assert_eq!(result.compressed_items[0].content, "a".repeat(40));
    }
}
