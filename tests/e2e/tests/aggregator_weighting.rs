//! Scenario: with default weights and one item per tier, all scoring
//! base=1 relevance=1, the weighted final scores and tier order fall
//! straight out of the per-tier weights.

use chrono::Utc;
use memoria_core::aggregator::{Aggregator, Source, Weights};
use memoria_core::hybrid_ltm::{HybridItem, Source as LtmSource};
use memoria_core::mtm::Chunk;
use memoria_core::stm::{Role, ScoredTurn, Turn};

#[test]
fn aggregator_weighting() {
    let aggregator = Aggregator::new(Weights::default(), 0.7, 0.85);
    let query_embedding = vec![1.0f32, 0.0];

    let stm = vec![ScoredTurn {
        turn: Turn {
            id: "t1".to_string(),
            role: Role::User,
            content: "stm content".to_string(),
            embedding: Some(query_embedding.clone()),
            intent: None,
            keywords: vec![],
            created_at: Utc::now(),
            token_estimate: 1,
        },
        similarity: 0.0,
    }];

    let mtm = vec![memoria_core::mtm::ScoredChunk {
        chunk: Chunk {
            id: "c1".to_string(),
            summary: "mtm content".to_string(),
            source_turn_ids: vec![],
            topics: vec![],
            embedding: Some(query_embedding.clone()),
            importance: 1.0,
            message_count: 1,
            created_at: Utc::now(),
            graph_mirror_id: None,
        },
        score: 0.0,
    }];

    let ltm = vec![HybridItem {
        source: LtmSource::Vector,
        content: Some("ltm content".to_string()),
        vector_score: Some(1.0),
        graph_path_len: None,
        vector_id: None,
        graph_entity_id: None,
        metadata: serde_json::json!({"importance": 1.0}),
    }];

    let result = aggregator.aggregate(&stm, &mtm, &ltm, Some(&query_embedding));

    assert_eq!(result.len(), 3);
    assert_eq!(result[0].source, Source::Stm);
    assert_eq!(result[1].source, Source::Mtm);
    assert_eq!(result[2].source, Source::Ltm);
    assert!((result[0].final_score - 0.5).abs() < 0.05);
    assert!((result[1].final_score - 0.3).abs() < 0.05);
    assert!((result[2].final_score - 0.2).abs() < 1e-6);
}
