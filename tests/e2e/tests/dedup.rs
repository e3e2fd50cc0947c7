//! Scenario: two MTM items whose texts share high token Jaccard overlap but
//! different scores collapse to the higher-scored one.

use chrono::Utc;
use memoria_core::aggregator::{Aggregator, Weights};
use memoria_core::mtm::{Chunk, ScoredChunk};

fn chunk(summary: &str) -> ScoredChunk {
    ScoredChunk {
        chunk: Chunk {
            id: summary.to_string(),
            summary: summary.to_string(),
            source_turn_ids: vec![],
            topics: vec![],
            embedding: None,
            importance: 0.5,
            message_count: 1,
            created_at: Utc::now(),
            graph_mirror_id: None,
        },
        score: 0.0,
    }
}

#[test]
fn dedup_keeps_higher_scored_item() {
    let aggregator = Aggregator::new(Weights::default(), 0.7, 0.85);

    // Nine of ten tokens shared between the two summaries: Jaccard > 0.85.
    // MTM base score is position-based, so the more recently appended of
    // the two (`second`) scores strictly higher than the first.
    let first = chunk("the parser module raises an error when given malformed unexpected broken input now");
    let second = chunk("the parser module raises an error when given malformed unexpected broken input today");

    let result = aggregator.aggregate(&[], &[first, second], &[], None);

    let matches: Vec<_> = result.iter().filter(|i| i.content.contains("parser module")).collect();
    assert_eq!(matches.len(), 1);
    assert!(matches[0].content.contains("today"));
}
