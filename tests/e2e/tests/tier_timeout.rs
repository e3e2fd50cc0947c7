//! Scenario: a tier that misses its retrieval deadline degrades to empty
//! instead of failing the whole call, and the other tiers are unaffected.

use std::sync::Arc;

use memoria_core::config::Config;
use memoria_core::embeddings::{Embedder, HashEmbedder};
use memoria_core::graph_store::{
    Direction, GraphQuery, GraphRow, GraphStore, GraphStoreError, InMemoryGraphStore, NeighborMatch, Node,
};
use memoria_core::hybrid_ltm::HybridLtm;
use memoria_core::mtm::MidTermMemory;
use memoria_core::orchestrator::Orchestrator;
use memoria_core::preprocessor::Preprocessor;
use memoria_core::stm::{Role, ShortTermMemory};
use memoria_core::summarizer::Summarizer;
use memoria_core::vector_store::InMemoryVectorStore;

/// A `GraphStore` that sleeps before every call, to force the orchestrator's
/// per-tier deadline to trip.
struct SlowGraphStore {
    inner: InMemoryGraphStore,
    delay: std::time::Duration,
}

impl GraphStore for SlowGraphStore {
    fn upsert_node(&self, label: &str, id: Option<&str>, properties: serde_json::Value) -> Result<String, GraphStoreError> {
        self.inner.upsert_node(label, id, properties)
    }
    fn upsert_edge(
        &self,
        from_id: &str,
        to_id: &str,
        edge_type: &str,
        properties: Option<serde_json::Value>,
    ) -> Result<String, GraphStoreError> {
        self.inner.upsert_edge(from_id, to_id, edge_type, properties)
    }
    fn get_node(&self, id: &str) -> Result<Node, GraphStoreError> {
        self.inner.get_node(id)
    }
    fn delete_node(&self, id: &str) -> Result<(), GraphStoreError> {
        self.inner.delete_node(id)
    }
    fn set_vector_id(&self, id: &str, vector_id: Option<&str>) -> Result<(), GraphStoreError> {
        self.inner.set_vector_id(id, vector_id)
    }
    fn neighbors(
        &self,
        id: &str,
        edge_type: Option<&str>,
        direction: Direction,
        max_depth: usize,
    ) -> Result<Vec<NeighborMatch>, GraphStoreError> {
        std::thread::sleep(self.delay);
        self.inner.neighbors(id, edge_type, direction, max_depth)
    }
    fn query(&self, query: &GraphQuery) -> Result<Vec<GraphRow>, GraphStoreError> {
        std::thread::sleep(self.delay);
        self.inner.query(query)
    }
    fn node_count(&self) -> usize {
        self.inner.node_count()
    }
    fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tier_timeout() {
    let mut config = Config::default();
    config.orchestrator.tier_deadline_ms = 200;
    // GRAPH_ONLY guarantees the graph backend is hit unconditionally, even
    // with an empty vector store, so the injected delay always fires.
    config.ltm.strategy = memoria_core::hybrid_ltm::Strategy::GraphOnly;

    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(config.embedding_dim));
    let preprocessor = Preprocessor::new(embedder.clone());
    let stm = Arc::new(ShortTermMemory::new(config.stm_max, config.stm_ttl_seconds));
    let mtm = Arc::new(MidTermMemory::new(config.mtm_max));
    let vector_store = Arc::new(InMemoryVectorStore::new(config.embedding_dim));
    let graph_store = Arc::new(SlowGraphStore {
        inner: InMemoryGraphStore::new(),
        delay: std::time::Duration::from_secs(5),
    });
    let ltm = Arc::new(HybridLtm::new(
        embedder.clone(),
        vector_store,
        graph_store,
        config.ltm.strategy,
        config.ltm.expand_depth,
    ));
    let summarizer = Summarizer::local(embedder);
    let orch = Orchestrator::new(preprocessor, stm, mtm, Some(ltm), summarizer, config);

    orch.add_message(Role::User, "tell me about the parser").await.unwrap();

    let start = std::time::Instant::now();
    let bundle = orch
        .get_context("tell me about the parser", 10, 10, 10, true, true)
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed < std::time::Duration::from_millis(750), "took {elapsed:?}");
    assert_eq!(bundle.counts.ltm, 0);
    assert_eq!(bundle.timeouts, vec!["ltm"]);
    assert_eq!(bundle.counts.stm, 1);
}
