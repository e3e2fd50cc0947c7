//! Scenario: a HybridLTM insertion with declared graph links creates a
//! consistent, bidirectionally-linked node + vector record pair, plus the
//! declared structural edge.

use std::sync::Arc;

use memoria_core::embeddings::HashEmbedder;
use memoria_core::graph_store::{Direction, InMemoryGraphStore};
use memoria_core::hybrid_ltm::{GraphLink, HybridLtm, IngestMetadata, Strategy};
use memoria_core::vector_store::InMemoryVectorStore;

#[test]
fn hybrid_insertion_link() {
    let embedder = Arc::new(HashEmbedder::new(16));
    let vector_store = Arc::new(InMemoryVectorStore::new(16));
    let graph_store = Arc::new(InMemoryGraphStore::new());
    let ltm = HybridLtm::new(embedder, vector_store.clone(), graph_store.clone(), Strategy::VectorFirst, 1);

    let metadata = IngestMetadata {
        category: Some("function".to_string()),
        graph_links: Some(vec![GraphLink {
            edge_type: "BELONGS_TO".to_string(),
            target: "mod_bar".to_string(),
            properties: None,
        }]),
        ..Default::default()
    };

    let result = ltm.add("fn foo", metadata).unwrap();

    let foo_node = graph_store.get_node(&result.graph_entity_id).unwrap();
    assert_eq!(foo_node.label, "Function");
    assert_eq!(foo_node.vector_id.as_deref(), Some(result.vector_id.as_str()));

    let record = vector_store.get(&result.vector_id).unwrap();
    assert_eq!(record.payload["graph_entity_id"].as_str(), Some(result.graph_entity_id.as_str()));

    let neighbors = graph_store
        .neighbors(&result.graph_entity_id, Some("BELONGS_TO"), Direction::Out, 1)
        .unwrap();
    assert_eq!(neighbors.len(), 1);
    assert_eq!(neighbors[0].node.properties["name"].as_str(), Some("mod_bar"));
}
