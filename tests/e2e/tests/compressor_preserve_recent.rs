//! Scenario: score-based compression under a tight budget still forces the
//! most-recent STM items through, displacing lower-scored non-recent items.

use chrono::Utc;
use memoria_core::aggregator::{AggregatedItem, Source};
use memoria_core::compressor::{Compressor, Strategy};

/// Exactly 400 chars -> 100 tokens under the `chars/4` estimator, tagged at
/// the front so assertions can tell items apart without changing length.
fn item(source: Source, score: f32, tag: &str, created_at: chrono::DateTime<Utc>) -> AggregatedItem {
    let mut content = format!("[{tag}]");
    content.push_str(&"x".repeat(400 - content.len()));
    AggregatedItem {
        source,
        content,
        base_score: score,
        relevance_score: score,
        final_score: score,
        metadata: serde_json::json!({}),
        embedding: None,
        created_at,
    }
}

#[test]
fn compressor_preserve_recent() {
    let compressor = Compressor::new(0.7);
    let now = Utc::now();

    let mut items: Vec<AggregatedItem> = (0..6)
        .map(|i| item(Source::Mtm, 0.90 - i as f32 * 0.01, &format!("mtm{i}"), now))
        .collect();
    items.push(item(Source::Stm, 0.01, "stm-older", now - chrono::Duration::minutes(10)));
    items.push(item(Source::Stm, 0.01, "stm-newest", now));

    let result = compressor.compress(&items, 500, Strategy::ScoreBased, true, 2);

    assert_eq!(result.items_kept, 5);
    assert!(result.total_tokens <= 500);
    let stm_kept: Vec<_> = result.compressed_items.iter().filter(|i| i.source == Source::Stm).collect();
    assert_eq!(stm_kept.len(), 2);
}
