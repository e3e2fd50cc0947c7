//! # Memoria Core
//!
//! Hierarchical conversational-memory engine for LLM-backed assistants.
//!
//! A conversation's state is held across three tiers of increasing
//! permanence and decreasing recency:
//!
//! - **Short-Term Memory** ([`stm`]): a bounded, FIFO ring of recent raw
//!   turns with a lazy TTL purge.
//! - **Mid-Term Memory** ([`mtm`]): a bounded FIFO of summarized chunks,
//!   produced by the [`summarizer`] when STM fills, with an optional graph
//!   mirror linking chunk topics to known entities.
//! - **Hybrid Long-Term Memory** ([`hybrid_ltm`]): a [`vector_store`] and
//!   [`graph_store`] pair, linked by bidirectional ids, queried under one of
//!   five strategies (vector-only, graph-only, vector-first, graph-first,
//!   parallel).
//!
//! The [`orchestrator`] ties the tiers together: a [`preprocessor`] turns a
//! raw query into intent + keywords + embedding, the three tiers are
//! retrieved concurrently under per-tier deadlines, an [`aggregator`] scores
//! and dedups the results, and a [`compressor`] fits the ranked list to a
//! token budget before it is handed back as a [`orchestrator::ContextBundle`].
//!
//! Text is embedded via the [`embeddings`] module's `Embedder` trait, which
//! falls back from a local ONNX model to a deterministic hash embedding when
//! no real model is configured.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod aggregator;
pub mod compressor;
pub mod config;
pub mod error;
pub mod graph_store;
pub mod hybrid_ltm;
pub mod keywords;
pub mod mtm;
pub mod orchestrator;
pub mod preprocessor;
pub mod snapshot;
pub mod stm;
pub mod summarizer;
pub mod vector_store;

pub mod embeddings;

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::error::{Error, Result};

    pub use crate::config::Config;
    pub use crate::orchestrator::{ContextBundle, Orchestrator};

    pub use crate::stm::{Role, ShortTermMemory, Turn};

    pub use crate::mtm::{Chunk, MidTermMemory};

    pub use crate::summarizer::{LlmSummarize, Summarizer};

    pub use crate::hybrid_ltm::{HybridLtm, HybridLtmError, IngestMetadata, Strategy as LtmStrategy};

    pub use crate::preprocessor::{Intent, Preprocessor, QueryObject};

    pub use crate::aggregator::{AggregatedItem, Aggregator, Source as TierSource};

    pub use crate::compressor::{Compressor, CompressionResult, Strategy as CompressionStrategy};

    pub use crate::vector_store::{InMemoryVectorStore, VectorStore};

    #[cfg(feature = "vector-search")]
    pub use crate::vector_store::AnnVectorStore;

    pub use crate::graph_store::{GraphQuery, GraphStore, InMemoryGraphStore};

    pub use crate::embeddings::{cosine_similarity, Embedder, HashEmbedder, EMBEDDING_DIMENSIONS};

    #[cfg(feature = "embeddings")]
    pub use crate::embeddings::LocalEmbedder;

    pub use crate::snapshot::{Snapshot, save as save_snapshot, load as load_snapshot};
}
