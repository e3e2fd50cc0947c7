//! Mid-Term Memory (MTM)
//!
//! A bounded FIFO of summarized turn groups ("chunks"). Mirrors the same
//! `RwLock`-guarded-`VecDeque` shape as STM; additionally, when a graph
//! mirror capability is configured, each appended chunk gets a `Summary`
//! node with edges to any entity nodes its topics resolve to.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::embeddings::cosine_similarity;
use crate::graph_store::GraphStore;

/// A summarized group of STM turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk id.
    pub id: String,
    /// Concise summary text.
    pub summary: String,
    /// Ids of the source turns, in STM insertion order.
    pub source_turn_ids: Vec<String>,
    /// Extracted topic keywords.
    pub topics: Vec<String>,
    /// Embedding of `summary`, if computed.
    pub embedding: Option<Vec<f32>>,
    /// Heuristic importance in `[0, 1]`.
    pub importance: f32,
    /// Number of source turns summarized.
    pub message_count: usize,
    /// Insertion timestamp.
    pub created_at: DateTime<Utc>,
    /// Id of the mirrored `Summary` graph node, if a graph mirror is configured.
    pub graph_mirror_id: Option<String>,
}

/// A chunk scored against a query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Similarity score (cosine for embedding search, Jaccard for keyword search).
    pub score: f32,
}

fn now() -> DateTime<Utc> {
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch");
    DateTime::from_timestamp(dur.as_secs() as i64, dur.subsec_nanos()).unwrap_or_else(Utc::now)
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// Bounded FIFO of summarized turn groups, with an optional graph mirror.
pub struct MidTermMemory {
    max: usize,
    chunks: RwLock<VecDeque<Chunk>>,
    graph_mirror: Option<Arc<dyn GraphStore>>,
}

impl MidTermMemory {
    /// Create an MTM tier holding at most `max` chunks.
    pub fn new(max: usize) -> Self {
        Self {
            max: max.max(1),
            chunks: RwLock::new(VecDeque::new()),
            graph_mirror: None,
        }
    }

    /// Create an MTM tier that also mirrors each chunk into `graph_mirror`
    /// as a `Summary` node, with edges to any of its topics that already
    /// exist as graph entities.
    pub fn with_graph_mirror(max: usize, graph_mirror: Arc<dyn GraphStore>) -> Self {
        Self {
            max: max.max(1),
            chunks: RwLock::new(VecDeque::new()),
            graph_mirror: Some(graph_mirror),
        }
    }

    /// Append a chunk, evicting the oldest if over capacity. If a graph
    /// mirror is configured, creates/updates a `Summary` node with edges to
    /// any entity nodes its topics resolve to by name.
    pub fn add_chunk(&self, mut chunk: Chunk) -> Chunk {
        if let Some(graph) = &self.graph_mirror {
            let mirror_id = graph
                .upsert_node(
                    "Summary",
                    chunk.graph_mirror_id.as_deref(),
                    serde_json::json!({
                        "summary": chunk.summary,
                        "topics": chunk.topics,
                        "message_count": chunk.message_count,
                    }),
                )
                .ok();
            if let Some(mirror_id) = &mirror_id {
                for topic in &chunk.topics {
                    if let Ok(rows) = graph.query(&crate::graph_store::GraphQuery::FindByProperty {
                        label: None,
                        key: "name".to_string(),
                        value: serde_json::json!(topic),
                    }) {
                        for row in rows {
                            let _ = graph.upsert_edge(mirror_id, &row.node.id, "MENTIONS", None);
                        }
                    }
                }
            }
            chunk.graph_mirror_id = mirror_id;
        }

        let mut chunks = self.chunks.write().expect("mtm lock poisoned");
        chunks.push_back(chunk.clone());
        while chunks.len() > self.max {
            chunks.pop_front();
        }
        chunk
    }

    /// Last `n` chunks, in insertion order.
    pub fn get_recent_chunks(&self, n: usize) -> Vec<Chunk> {
        let chunks = self.chunks.read().expect("mtm lock poisoned");
        chunks.iter().rev().take(n).cloned().rev().collect()
    }

    /// Cosine search over chunks carrying an embedding; chunks without one
    /// score 0.
    pub fn search_by_embedding(&self, query: &[f32], top_k: usize) -> Vec<ScoredChunk> {
        let chunks = self.chunks.read().expect("mtm lock poisoned");
        let mut scored: Vec<ScoredChunk> = chunks
            .iter()
            .map(|c| {
                let score = c
                    .embedding
                    .as_deref()
                    .map(|e| cosine_similarity(query, e))
                    .unwrap_or(0.0);
                ScoredChunk {
                    chunk: c.clone(),
                    score,
                }
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    /// Jaccard search over chunk topics against `keywords`, ties broken by
    /// recency.
    pub fn search_by_keywords(&self, keywords: &[String], top_k: usize) -> Vec<ScoredChunk> {
        let query: HashSet<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        let chunks = self.chunks.read().expect("mtm lock poisoned");
        let mut scored: Vec<ScoredChunk> = chunks
            .iter()
            .map(|c| {
                let topics: HashSet<String> = c.topics.iter().map(|t| t.to_lowercase()).collect();
                ScoredChunk {
                    chunk: c.clone(),
                    score: jaccard(&query, &topics),
                }
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.chunk.created_at.cmp(&a.chunk.created_at))
        });
        scored.truncate(top_k);
        scored
    }

    /// Current chunk count.
    pub fn len(&self) -> usize {
        self.chunks.read().expect("mtm lock poisoned").len()
    }

    /// Whether MTM currently holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all chunks. Does not affect any LTM derivatives already promoted.
    pub fn clear(&self) {
        self.chunks.write().expect("mtm lock poisoned").clear();
    }

    /// Snapshot of every chunk, in insertion order. Used by `snapshot`.
    pub fn all_chunks(&self) -> Vec<Chunk> {
        self.chunks.read().expect("mtm lock poisoned").iter().cloned().collect()
    }

    /// Replace the entire contents with `chunks`, in the given order. Used
    /// when restoring from a snapshot.
    pub fn restore(&self, chunks: Vec<Chunk>) {
        *self.chunks.write().expect("mtm lock poisoned") = chunks.into_iter().collect();
    }
}

/// Build a new chunk id/timestamp pair for callers assembling a `Chunk`
/// outside the Summarizer (e.g. in tests).
pub fn new_chunk_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current timestamp, exposed for callers assembling a `Chunk` by hand.
pub fn chunk_timestamp() -> DateTime<Utc> {
    now()
}
