//! Runtime configuration
//!
//! A plain, `Default`-able struct carrying every enumerated configuration
//! key from the external interface, substituting for the teacher's
//! file-loaded TOML config — there's no on-disk config format mandated
//! here, so callers build a `Config` directly (or `..Default::default()`
//! it) and hand it to `Orchestrator::new`.

use serde::{Deserialize, Serialize};

use crate::aggregator::Weights as AggregatorWeights;
use crate::compressor::Strategy as CompressorStrategy;
use crate::hybrid_ltm::Strategy as LtmStrategy;

/// Compressor-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressorConfig {
    /// Token budget (default 2000).
    pub max_tokens: usize,
    /// Compression strategy (default `score_based`).
    pub strategy: CompressorStrategy,
    /// MMR trade-off lambda (default 0.7).
    pub mmr_lambda: f32,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            strategy: CompressorStrategy::ScoreBased,
            mmr_lambda: 0.7,
        }
    }
}

/// Aggregator-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Per-tier weights (default 0.5/0.3/0.2).
    pub weights: AggregatorWeights,
    /// Relevance vs base-score mix (default 0.7).
    pub alpha: f32,
    /// Jaccard dedup threshold (default 0.85).
    pub dedup_threshold: f32,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            weights: AggregatorWeights::default(),
            alpha: 0.7,
            dedup_threshold: 0.85,
        }
    }
}

/// HybridLTM-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LtmConfig {
    /// Default query strategy (default `VECTOR_FIRST`).
    pub strategy: LtmStrategy,
    /// Graph expansion depth for `VECTOR_FIRST` (default 1).
    pub expand_depth: usize,
}

impl Default for LtmConfig {
    fn default() -> Self {
        Self {
            strategy: LtmStrategy::VectorFirst,
            expand_depth: 1,
        }
    }
}

/// Orchestrator-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Per-tier retrieval deadline in milliseconds (default 2000).
    pub tier_deadline_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tier_deadline_ms: 2000,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// STM capacity (default 10).
    pub stm_max: usize,
    /// STM TTL in seconds; 0 disables (default 3600).
    pub stm_ttl_seconds: i64,
    /// MTM capacity (default 100).
    pub mtm_max: usize,
    /// STM→MTM promotion trigger threshold (default 5).
    pub summarize_every: usize,
    /// Vector dimension `D` (default 384).
    pub embedding_dim: usize,
    /// Compressor configuration.
    pub compressor: CompressorConfig,
    /// Aggregator configuration.
    pub aggregator: AggregatorConfig,
    /// HybridLTM configuration.
    pub ltm: LtmConfig,
    /// Orchestrator configuration.
    pub orchestrator: OrchestratorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stm_max: 10,
            stm_ttl_seconds: 3600,
            mtm_max: 100,
            summarize_every: 5,
            embedding_dim: crate::embeddings::EMBEDDING_DIMENSIONS,
            compressor: CompressorConfig::default(),
            aggregator: AggregatorConfig::default(),
            ltm: LtmConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}
