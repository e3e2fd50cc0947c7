//! Orchestrator
//!
//! Ties Preprocessor, STM, MTM, HybridLTM, Aggregator, and Compressor
//! together. `get_context` dispatches the three tier retrievals concurrently
//! under a per-tier deadline via `tokio::time::timeout`; a missed deadline
//! degrades that tier to empty rather than failing the call. `add_message`
//! appends to STM and triggers STM→MTM promotion every `summarize_every`
//! turns, serialized per instance via an internal async mutex on the
//! promotion counter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;

use crate::aggregator::{AggregatedItem, Aggregator};
use crate::compressor::{CompressionResult, Compressor};
use crate::config::Config;
use crate::error::Result;
use crate::hybrid_ltm::{HybridLtm, Strategy as LtmStrategy};
use crate::mtm::MidTermMemory;
use crate::preprocessor::{Preprocessor, QueryObject};
use crate::stm::{Role, ShortTermMemory};
use crate::summarizer::Summarizer;

/// Per-tier timing breakdown, in milliseconds.
#[derive(Debug, Clone, Default)]
pub struct Timings {
    /// Time spent preprocessing the query.
    pub preprocess: u64,
    /// Time spent on STM retrieval.
    pub stm: u64,
    /// Time spent on MTM retrieval.
    pub mtm: u64,
    /// Time spent on LTM retrieval.
    pub ltm: u64,
    /// Time spent aggregating.
    pub aggregate: u64,
    /// Time spent compressing.
    pub compress: u64,
    /// Total wall-clock time for the call.
    pub total: u64,
}

/// Per-tier item counts in a returned bundle.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counts {
    /// Items retrieved from STM.
    pub stm: usize,
    /// Items retrieved from MTM.
    pub mtm: usize,
    /// Items retrieved from LTM.
    pub ltm: usize,
}

/// The structured object `get_context` returns for prompt assembly.
#[derive(Debug, Clone)]
pub struct ContextBundle {
    /// The preprocessed query.
    pub query: QueryObject,
    /// The full aggregated, deduplicated item list before compression.
    pub aggregated: Vec<AggregatedItem>,
    /// The token-budgeted, compressed item list.
    pub compressed: CompressionResult,
    /// Per-tier item counts.
    pub counts: Counts,
    /// Per-stage timing breakdown.
    pub timings_ms: Timings,
    /// Tiers that missed their retrieval deadline, e.g. `["ltm"]`.
    pub timeouts: Vec<&'static str>,
}

fn elapsed_ms(start: std::time::Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Coordinates tier retrieval, aggregation, and compression for a single
/// conversational memory instance.
pub struct Orchestrator {
    preprocessor: Preprocessor,
    stm: Arc<ShortTermMemory>,
    mtm: Arc<MidTermMemory>,
    ltm: Option<Arc<HybridLtm>>,
    summarizer: Summarizer,
    aggregator: Aggregator,
    compressor: Compressor,
    config: Config,
    turns_since_last_summary: AtomicUsize,
    promotion_lock: AsyncMutex<()>,
}

impl Orchestrator {
    /// Build an orchestrator from its components and configuration.
    pub fn new(
        preprocessor: Preprocessor,
        stm: Arc<ShortTermMemory>,
        mtm: Arc<MidTermMemory>,
        ltm: Option<Arc<HybridLtm>>,
        summarizer: Summarizer,
        config: Config,
    ) -> Self {
        let aggregator = Aggregator::new(
            config.aggregator.weights,
            config.aggregator.alpha,
            config.aggregator.dedup_threshold,
        );
        let compressor = Compressor::new(config.compressor.mmr_lambda);
        Self {
            preprocessor,
            stm,
            mtm,
            ltm,
            summarizer,
            aggregator,
            compressor,
            config,
            turns_since_last_summary: AtomicUsize::new(0),
            promotion_lock: AsyncMutex::new(()),
        }
    }

    /// Retrieve and assemble a context bundle for `query`.
    pub async fn get_context(
        &self,
        query: &str,
        n_recent: usize,
        n_chunks: usize,
        n_ltm: usize,
        use_ltm: bool,
        use_embedding_search: bool,
    ) -> Result<ContextBundle> {
        let total_start = std::time::Instant::now();

        let pre_start = std::time::Instant::now();
        let q = self.preprocessor.preprocess(query);
        let preprocess_ms = elapsed_ms(pre_start);

        let deadline = Duration::from_millis(self.config.orchestrator.tier_deadline_ms);
        let mut timeouts: Vec<&'static str> = Vec::new();

        let stm_query_embedding = if use_embedding_search { q.embedding.clone() } else { None };

        let stm_start = std::time::Instant::now();
        let stm_fut = tokio::time::timeout(deadline, self.fetch_stm(n_recent, stm_query_embedding));
        let mtm_start = std::time::Instant::now();
        let mtm_fut = tokio::time::timeout(deadline, self.fetch_mtm(q.embedding.clone(), n_chunks));
        let ltm_start = std::time::Instant::now();
        let ltm_fut = tokio::time::timeout(deadline, self.fetch_ltm(&q, n_ltm, use_ltm));

        let (stm_result, mtm_result, ltm_result) = tokio::join!(stm_fut, mtm_fut, ltm_fut);

        let stm_ms = elapsed_ms(stm_start);
        let mtm_ms = elapsed_ms(mtm_start);
        let ltm_ms = elapsed_ms(ltm_start);

        let stm = stm_result.unwrap_or_else(|_| {
            timeouts.push("stm");
            tracing::warn!("stm retrieval missed its deadline");
            Vec::new()
        });
        let mtm = mtm_result.unwrap_or_else(|_| {
            timeouts.push("mtm");
            tracing::warn!("mtm retrieval missed its deadline");
            Vec::new()
        });
        let ltm = ltm_result.unwrap_or_else(|_| {
            timeouts.push("ltm");
            tracing::warn!("ltm retrieval missed its deadline");
            Vec::new()
        });

        let counts = Counts {
            stm: stm.len(),
            mtm: mtm.len(),
            ltm: ltm.len(),
        };

        let aggregate_start = std::time::Instant::now();
        let aggregated = self.aggregator.aggregate(&stm, &mtm, &ltm, q.embedding.as_deref());
        let aggregate_ms = elapsed_ms(aggregate_start);

        let compress_start = std::time::Instant::now();
        let compressed = self.compressor.compress(
            &aggregated,
            self.config.compressor.max_tokens,
            self.config.compressor.strategy,
            true,
            2,
        );
        let compress_ms = elapsed_ms(compress_start);

        let timings_ms = Timings {
            preprocess: preprocess_ms,
            stm: stm_ms,
            mtm: mtm_ms,
            ltm: ltm_ms,
            aggregate: aggregate_ms,
            compress: compress_ms,
            total: elapsed_ms(total_start),
        };

        Ok(ContextBundle {
            query: q,
            aggregated,
            compressed,
            counts,
            timings_ms,
            timeouts,
        })
    }

    async fn fetch_stm(
        &self,
        n_recent: usize,
        query_embedding: Option<Vec<f32>>,
    ) -> Vec<crate::stm::ScoredTurn> {
        self.stm.get_recent(n_recent, query_embedding.as_deref())
    }

    async fn fetch_mtm(&self, query_embedding: Option<Vec<f32>>, n_chunks: usize) -> Vec<crate::mtm::ScoredChunk> {
        match query_embedding {
            Some(embedding) => self.mtm.search_by_embedding(&embedding, n_chunks),
            None => self
                .mtm
                .get_recent_chunks(n_chunks)
                .into_iter()
                .map(|chunk| crate::mtm::ScoredChunk { chunk, score: 0.0 })
                .collect(),
        }
    }

    async fn fetch_ltm(
        &self,
        q: &QueryObject,
        n_ltm: usize,
        use_ltm: bool,
    ) -> Vec<crate::hybrid_ltm::HybridItem> {
        if !use_ltm {
            return Vec::new();
        }
        let Some(ltm) = self.ltm.clone() else {
            return Vec::new();
        };
        let strategy: Option<LtmStrategy> = None; // use the HybridLTM's configured default
        let embedding = q.embedding.clone();
        let raw_query = q.normalized_text.clone();

        // GraphStore/VectorStore backends are synchronous and may block on
        // I/O; running the query on a blocking-pool thread lets the
        // surrounding `tokio::time::timeout` actually preempt a slow tier
        // instead of stalling the task that polls it.
        let result = tokio::task::spawn_blocking(move || {
            ltm.query(embedding.as_deref(), &raw_query, strategy, n_ltm)
        })
        .await;

        match result {
            Ok(Ok(result)) => result.items,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "ltm retrieval failed");
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(error = %err, "ltm retrieval task panicked");
                Vec::new()
            }
        }
    }

    /// Preprocess and append a message to STM; every `summarize_every`
    /// turns, promote the most recent run into an MTM chunk. Promotion is
    /// serialized per instance via `promotion_lock`, and never blocks the
    /// triggering call beyond that serialization.
    pub async fn add_message(&self, role: Role, content: &str) -> Result<()> {
        let q = self.preprocessor.preprocess(content);
        self.stm.add(
            role,
            content.to_string(),
            q.embedding,
            Some(format!("{:?}", q.intent).to_lowercase()),
            q.keywords,
        );

        let count = self.turns_since_last_summary.fetch_add(1, Ordering::SeqCst) + 1;
        if count >= self.config.summarize_every {
            let _guard = self.promotion_lock.lock().await;
            // Re-check under the lock: another concurrent add_message may
            // have already triggered and reset the counter.
            if self.turns_since_last_summary.load(Ordering::SeqCst) >= self.config.summarize_every {
                let recent = self.stm.get_recent(self.config.summarize_every, None);
                let turns: Vec<_> = recent.into_iter().map(|s| s.turn).collect();
                if !turns.is_empty() {
                    let chunk = self.summarizer.summarize(&turns);
                    self.mtm.add_chunk(chunk);
                }
                self.turns_since_last_summary.store(0, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    /// Current promotion counter, exposed for snapshotting.
    pub fn turns_since_last_summary(&self) -> usize {
        self.turns_since_last_summary.load(Ordering::SeqCst)
    }

    /// Restore the promotion counter, e.g. after loading a snapshot.
    pub fn restore_turns_since_last_summary(&self, count: usize) {
        self.turns_since_last_summary.store(count, Ordering::SeqCst);
    }

    /// Access the STM tier, e.g. for snapshotting.
    pub fn stm(&self) -> &ShortTermMemory {
        &self.stm
    }

    /// Access the MTM tier, e.g. for snapshotting.
    pub fn mtm(&self) -> &MidTermMemory {
        &self.mtm
    }
}
