use std::sync::Arc;

use memoria_core::config::Config;
use memoria_core::embeddings::{Embedder, HashEmbedder};
use memoria_core::graph_store::InMemoryGraphStore;
use memoria_core::hybrid_ltm::HybridLtm;
use memoria_core::mtm::MidTermMemory;
use memoria_core::orchestrator::Orchestrator;
use memoria_core::preprocessor::Preprocessor;
use memoria_core::stm::ShortTermMemory;
use memoria_core::summarizer::Summarizer;
use memoria_core::vector_store::InMemoryVectorStore;

/// An `Orchestrator` wired entirely to in-memory backends, plus direct
/// handles to the graph and vector stores so tests can inspect state the
/// Orchestrator's own API doesn't expose.
///
/// # Example
///
/// ```rust,ignore
/// let mut harness = TestHarness::new();
/// harness.config.stm_max = 3;
/// let harness = harness.build();
/// ```
pub struct TestHarness {
    /// Configuration to build the orchestrator with; mutate before `build`.
    pub config: Config,
}

/// A built harness: the orchestrator plus the concrete backends behind it.
pub struct BuiltHarness {
    /// The orchestrator under test.
    pub orchestrator: Orchestrator,
    /// The vector store backing `orchestrator`'s HybridLTM tier.
    pub vector_store: Arc<InMemoryVectorStore>,
    /// The graph store backing `orchestrator`'s HybridLTM tier.
    pub graph_store: Arc<InMemoryGraphStore>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Start from default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Assemble the orchestrator and its backends from `self.config`.
    pub fn build(self) -> BuiltHarness {
        let config = self.config;
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(config.embedding_dim));
        let preprocessor = Preprocessor::new(embedder.clone());
        let stm = Arc::new(ShortTermMemory::new(config.stm_max, config.stm_ttl_seconds));
        let mtm = Arc::new(MidTermMemory::new(config.mtm_max));
        let vector_store = Arc::new(InMemoryVectorStore::new(config.embedding_dim));
        let graph_store = Arc::new(InMemoryGraphStore::new());
        let ltm = Arc::new(HybridLtm::new(
            embedder.clone(),
            vector_store.clone(),
            graph_store.clone(),
            config.ltm.strategy,
            config.ltm.expand_depth,
        ));
        let summarizer = Summarizer::local(embedder);
        let orchestrator = Orchestrator::new(preprocessor, stm, mtm, Some(ltm), summarizer, config);

        BuiltHarness {
            orchestrator,
            vector_store,
            graph_store,
        }
    }
}
