//! HybridLTM
//!
//! The coordinator over a `VectorStore` + `GraphStore` pair, linked by a
//! bidirectional `(entity_id, vector_id)` correspondence that HybridLTM owns
//! — neither backing store owns the other. Insertion is transactional over
//! the node+record pair; graph links declared alongside the content are
//! best-effort and never roll back the main insertion.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::embeddings::Embedder;
use crate::graph_store::{Direction, GraphQuery, GraphStore, GraphStoreError, Node};
use crate::vector_store::{VectorStore, VectorStoreError};

/// Declares a graph edge to create alongside a `HybridLtm::add` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphLink {
    /// Edge type (e.g. `BELONGS_TO`, `FIXES`).
    #[serde(rename = "type")]
    pub edge_type: String,
    /// Target node id, or a human-readable name used to create a
    /// placeholder node when no such id exists yet.
    pub target: String,
    /// Edge properties.
    pub properties: Option<serde_json::Value>,
}

/// Metadata accompanying a `HybridLtm::add` call.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestMetadata {
    /// Drives the node label; unknown categories default to `Fact`.
    pub category: Option<String>,
    /// Free-form tags.
    pub tags: Option<Vec<String>>,
    /// Source file path, for code-grounded facts.
    pub file_path: Option<String>,
    /// Source line range start.
    pub line_start: Option<u32>,
    /// Source line range end.
    pub line_end: Option<u32>,
    /// Caller-declared importance.
    pub importance: Option<f32>,
    /// Project scoping id.
    pub project_id: Option<String>,
    /// Structural links to create alongside the record.
    pub graph_links: Option<Vec<GraphLink>>,
}

/// Result of a successful `HybridLtm::add`.
#[derive(Debug, Clone)]
pub struct IngestResult {
    /// The inserted vector record's id.
    pub vector_id: String,
    /// The created/updated graph node's id.
    pub graph_entity_id: String,
}

/// Which query strategy `HybridLtm::query` should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    /// Vector search only.
    VectorOnly,
    /// Structural graph query only.
    GraphOnly,
    /// Vector search, then expand each hit's graph neighborhood.
    VectorFirst,
    /// Graph query, then enrich each node with its linked vector content.
    GraphFirst,
    /// Vector search and graph query concurrently, joined by shared ids.
    Parallel,
}

/// Where a merged result item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// From the vector store.
    Vector,
    /// From the graph store.
    Graph,
    /// Present in both, joined by a shared id.
    Both,
}

/// A single result item from a `HybridLtm::query` call.
#[derive(Debug, Clone)]
pub struct HybridItem {
    /// Which backend(s) contributed this item.
    pub source: Source,
    /// Vector record content, if the vector side contributed.
    pub content: Option<String>,
    /// Vector search score, if the vector side contributed.
    pub vector_score: Option<f32>,
    /// Graph-traversal path length from the query anchor, if the graph side contributed.
    pub graph_path_len: Option<usize>,
    /// Vector record id, if known.
    pub vector_id: Option<String>,
    /// Graph node id, if known.
    pub graph_entity_id: Option<String>,
    /// Payload/properties merged from whichever side(s) contributed.
    pub metadata: serde_json::Value,
}

/// Result of a `HybridLtm::query` call.
#[derive(Debug, Clone, Default)]
pub struct HybridQueryResult {
    /// Ranked result items.
    pub items: Vec<HybridItem>,
    /// Set when a `VECTOR_FIRST` query degraded to `VECTOR_ONLY` because the
    /// graph backend was unavailable.
    pub degraded: bool,
}

/// Errors specific to HybridLTM coordination, beyond what the underlying
/// stores report.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum HybridLtmError {
    /// The embedding step failed.
    #[error(transparent)]
    Embedding(#[from] crate::embeddings::EmbeddingError),
    /// The vector store failed.
    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),
    /// The graph store failed.
    #[error(transparent)]
    GraphStore(#[from] GraphStoreError),
    /// A required backend was unavailable for the requested strategy.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

fn label_for_category(category: Option<&str>) -> String {
    match category {
        Some("function") => "Function".to_string(),
        Some("module") => "Module".to_string(),
        Some("commit_log") => "Commit".to_string(),
        Some("bug") => "Bug".to_string(),
        Some("concept") => "Concept".to_string(),
        Some("doc") => "Doc".to_string(),
        _ => "Fact".to_string(),
    }
}

fn metadata_properties(metadata: &IngestMetadata) -> serde_json::Value {
    serde_json::json!({
        "tags": metadata.tags,
        "file_path": metadata.file_path,
        "line_start": metadata.line_start,
        "line_end": metadata.line_end,
        "importance": metadata.importance,
        "project_id": metadata.project_id,
    })
}

/// Coordinator over a `VectorStore` + `GraphStore` pair.
pub struct HybridLtm {
    embedder: Arc<dyn Embedder>,
    vector_store: Option<Arc<dyn VectorStore>>,
    graph_store: Option<Arc<dyn GraphStore>>,
    default_strategy: Strategy,
    expand_depth: usize,
}

impl HybridLtm {
    /// Build a HybridLTM coordinator over both backends.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        graph_store: Arc<dyn GraphStore>,
        default_strategy: Strategy,
        expand_depth: usize,
    ) -> Self {
        Self::with_backends(embedder, Some(vector_store), Some(graph_store), default_strategy, expand_depth)
    }

    /// Build a HybridLTM coordinator with either backend genuinely absent.
    /// `VECTOR_ONLY`/`VECTOR_FIRST` still succeed without a graph store
    /// (`VECTOR_FIRST` degrades, reporting `degraded: true`); `GRAPH_ONLY`/
    /// `GRAPH_FIRST` and `add`/`PARALLEL` fail with `BackendUnavailable` when
    /// the backend they require is missing.
    pub fn with_backends(
        embedder: Arc<dyn Embedder>,
        vector_store: Option<Arc<dyn VectorStore>>,
        graph_store: Option<Arc<dyn GraphStore>>,
        default_strategy: Strategy,
        expand_depth: usize,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            graph_store,
            default_strategy,
            expand_depth,
        }
    }

    /// Insert a fact. Steps 2-4 (node create, vector insert, vector-id
    /// back-link) are transactional: any failure rolls back what already
    /// succeeded. Declared `graph_links` (step 5) are best-effort.
    pub fn add(&self, content: &str, metadata: IngestMetadata) -> Result<IngestResult, HybridLtmError> {
        let vector_store = self
            .vector_store
            .as_ref()
            .ok_or_else(|| HybridLtmError::BackendUnavailable("vector_store".to_string()))?;
        let graph_store = self
            .graph_store
            .as_ref()
            .ok_or_else(|| HybridLtmError::BackendUnavailable("graph_store".to_string()))?;

        let embedding = self.embedder.embed(content)?;

        let label = label_for_category(metadata.category.as_deref());
        let graph_entity_id = graph_store.upsert_node(&label, None, metadata_properties(&metadata))?;

        let vector_id = uuid::Uuid::new_v4().to_string();
        let payload = serde_json::json!({
            "content": content,
            "graph_entity_id": graph_entity_id,
            "project_id": metadata.project_id,
            "tags": metadata.tags,
            "category": metadata.category,
        });

        if let Err(err) = vector_store.add(&vector_id, embedding, payload) {
            let _ = graph_store.delete_node(&graph_entity_id);
            return Err(err.into());
        }

        if let Err(err) = graph_store.set_vector_id(&graph_entity_id, Some(&vector_id)) {
            let _ = graph_store.delete_node(&graph_entity_id);
            let _ = vector_store.delete(&vector_id);
            return Err(err.into());
        }

        if let Some(links) = &metadata.graph_links {
            for link in links {
                if let Err(err) = self.create_link(graph_store.as_ref(), &graph_entity_id, link) {
                    tracing::warn!(
                        edge_type = %link.edge_type,
                        target = %link.target,
                        error = %err,
                        "best-effort graph link failed, insertion not rolled back"
                    );
                }
            }
        }

        Ok(IngestResult {
            vector_id,
            graph_entity_id,
        })
    }

    fn create_link(
        &self,
        graph_store: &dyn GraphStore,
        from_id: &str,
        link: &GraphLink,
    ) -> Result<(), GraphStoreError> {
        let target_id = if graph_store.get_node(&link.target).is_ok() {
            link.target.clone()
        } else {
            graph_store.upsert_node("Fact", None, serde_json::json!({"name": link.target}))?
        };
        graph_store
            .upsert_edge(from_id, &target_id, &link.edge_type, link.properties.clone())
            .map(|_| ())
    }

    /// Run a query under `strategy`, or the configured default strategy when
    /// `strategy` is `None` (what the Orchestrator requests as its general
    /// "hybrid" query), top_k results from the vector side (and bounding
    /// traversal where relevant).
    pub fn query(
        &self,
        query_embedding: Option<&[f32]>,
        raw_query: &str,
        strategy: Option<Strategy>,
        top_k: usize,
    ) -> Result<HybridQueryResult, HybridLtmError> {
        let strategy = strategy.unwrap_or(self.default_strategy);

        match strategy {
            Strategy::VectorOnly => self.query_vector_only(query_embedding, top_k),
            Strategy::GraphOnly => self.query_graph_only(raw_query, top_k),
            Strategy::VectorFirst => self.query_vector_first(query_embedding, top_k),
            Strategy::GraphFirst => self.query_graph_first(raw_query, top_k),
            Strategy::Parallel => self.query_parallel(query_embedding, raw_query, top_k),
        }
    }

    fn require_vector(&self) -> Result<&Arc<dyn VectorStore>, HybridLtmError> {
        self.vector_store
            .as_ref()
            .ok_or_else(|| HybridLtmError::BackendUnavailable("vector_store".to_string()))
    }

    fn require_graph(&self) -> Result<&Arc<dyn GraphStore>, HybridLtmError> {
        self.graph_store
            .as_ref()
            .ok_or_else(|| HybridLtmError::BackendUnavailable("graph_store".to_string()))
    }

    fn query_vector_only(
        &self,
        query_embedding: Option<&[f32]>,
        top_k: usize,
    ) -> Result<HybridQueryResult, HybridLtmError> {
        let vector_store = self.require_vector()?;
        let Some(q) = query_embedding else {
            return Ok(HybridQueryResult::default());
        };
        let matches = vector_store.search(q, top_k, None)?;
        let items = matches
            .into_iter()
            .map(|(id, score, payload)| HybridItem {
                source: Source::Vector,
                content: payload.get("content").and_then(|v| v.as_str()).map(|s| s.to_string()),
                vector_score: Some(score),
                graph_path_len: None,
                vector_id: Some(id),
                graph_entity_id: payload
                    .get("graph_entity_id")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                metadata: payload,
            })
            .collect();
        Ok(HybridQueryResult {
            items,
            degraded: false,
        })
    }

    fn query_graph_only(&self, raw_query: &str, top_k: usize) -> Result<HybridQueryResult, HybridLtmError> {
        let graph_store = self.require_graph()?;
        let rows = graph_store.query(&GraphQuery::FindByProperty {
            label: None,
            key: "name".to_string(),
            value: serde_json::json!(raw_query),
        })?;
        let items = rows
            .into_iter()
            .take(top_k)
            .map(|row| node_to_item(row.node, row.path.len()))
            .collect();
        Ok(HybridQueryResult {
            items,
            degraded: false,
        })
    }

    fn query_vector_first(
        &self,
        query_embedding: Option<&[f32]>,
        top_k: usize,
    ) -> Result<HybridQueryResult, HybridLtmError> {
        let vector_store = self.require_vector()?;
        let Some(q) = query_embedding else {
            return Ok(HybridQueryResult::default());
        };
        let matches = vector_store.search(q, top_k, None)?;

        let Some(graph_store) = &self.graph_store else {
            let items = matches
                .into_iter()
                .map(|(id, score, payload)| HybridItem {
                    source: Source::Vector,
                    content: payload.get("content").and_then(|v| v.as_str()).map(|s| s.to_string()),
                    vector_score: Some(score),
                    graph_path_len: None,
                    vector_id: Some(id),
                    graph_entity_id: None,
                    metadata: payload,
                })
                .collect();
            return Ok(HybridQueryResult { items, degraded: true });
        };

        let mut items = Vec::new();
        for (vector_id, score, payload) in matches {
            let graph_entity_id = payload.get("graph_entity_id").and_then(|v| v.as_str());
            items.push(HybridItem {
                source: Source::Vector,
                content: payload.get("content").and_then(|v| v.as_str()).map(|s| s.to_string()),
                vector_score: Some(score),
                graph_path_len: Some(0),
                vector_id: Some(vector_id.clone()),
                graph_entity_id: graph_entity_id.map(|s| s.to_string()),
                metadata: payload.clone(),
            });

            if let Some(entity_id) = graph_entity_id {
                if let Ok(neighbors) = graph_store.neighbors(entity_id, None, Direction::Both, self.expand_depth) {
                    for neighbor in neighbors {
                        items.push(HybridItem {
                            source: Source::Graph,
                            content: None,
                            vector_score: None,
                            graph_path_len: Some(neighbor.path.len()),
                            vector_id: neighbor.node.vector_id.clone(),
                            graph_entity_id: Some(neighbor.node.id.clone()),
                            metadata: neighbor.node.properties.clone(),
                        });
                    }
                }
            }
        }
        Self::sort_merged(&mut items);
        Ok(HybridQueryResult {
            items,
            degraded: false,
        })
    }

    fn query_graph_first(&self, raw_query: &str, top_k: usize) -> Result<HybridQueryResult, HybridLtmError> {
        let graph_store = self.require_graph()?;
        let vector_store = self.require_vector()?;

        let rows = graph_store.query(&GraphQuery::FindByProperty {
            label: None,
            key: "name".to_string(),
            value: serde_json::json!(raw_query),
        })?;

        let mut items = Vec::new();
        for row in rows.into_iter().take(top_k) {
            if let Some(vector_id) = &row.node.vector_id {
                if let Ok(record) = vector_store.get(vector_id) {
                    items.push(HybridItem {
                        source: Source::Both,
                        content: record.payload.get("content").and_then(|v| v.as_str()).map(|s| s.to_string()),
                        vector_score: None,
                        graph_path_len: Some(row.path.len()),
                        vector_id: Some(vector_id.clone()),
                        graph_entity_id: Some(row.node.id.clone()),
                        metadata: row.node.properties.clone(),
                    });
                    continue;
                }
            }
            items.push(node_to_item(row.node, row.path.len()));
        }
        Ok(HybridQueryResult {
            items,
            degraded: false,
        })
    }

    fn query_parallel(
        &self,
        query_embedding: Option<&[f32]>,
        raw_query: &str,
        top_k: usize,
    ) -> Result<HybridQueryResult, HybridLtmError> {
        let vector_store = self.require_vector()?;
        let graph_store = self.require_graph()?;

        let vector_matches = match query_embedding {
            Some(q) => vector_store.search(q, top_k, None)?,
            None => Vec::new(),
        };
        let graph_rows = graph_store.query(&GraphQuery::FindByProperty {
            label: None,
            key: "name".to_string(),
            value: serde_json::json!(raw_query),
        })?;

        let mut by_entity: std::collections::HashMap<String, HybridItem> = std::collections::HashMap::new();

        for (vector_id, score, payload) in vector_matches {
            let graph_entity_id = payload
                .get("graph_entity_id")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            let key = graph_entity_id.clone().unwrap_or_else(|| vector_id.clone());
            by_entity.insert(
                key,
                HybridItem {
                    source: Source::Vector,
                    content: payload.get("content").and_then(|v| v.as_str()).map(|s| s.to_string()),
                    vector_score: Some(score),
                    graph_path_len: None,
                    vector_id: Some(vector_id),
                    graph_entity_id,
                    metadata: payload,
                },
            );
        }

        for row in graph_rows.into_iter().take(top_k) {
            by_entity
                .entry(row.node.id.clone())
                .and_modify(|item| {
                    item.source = Source::Both;
                    item.graph_path_len = Some(row.path.len());
                })
                .or_insert_with(|| HybridItem {
                    source: Source::Graph,
                    content: None,
                    vector_score: None,
                    graph_path_len: Some(row.path.len()),
                    vector_id: row.node.vector_id.clone(),
                    graph_entity_id: Some(row.node.id.clone()),
                    metadata: row.node.properties.clone(),
                });
        }

        let mut items: Vec<HybridItem> = by_entity.into_values().collect();
        Self::sort_merged(&mut items);
        items.truncate(top_k);
        Ok(HybridQueryResult {
            items,
            degraded: false,
        })
    }

    /// Tie-breaking: vector score descending, then graph-path length
    /// ascending, then (absent a recency field on the merged item) stable
    /// by original order.
    fn sort_merged(items: &mut [HybridItem]) {
        items.sort_by(|a, b| {
            let score_a = a.vector_score.unwrap_or(f32::NEG_INFINITY);
            let score_b = b.vector_score.unwrap_or(f32::NEG_INFINITY);
            score_b
                .partial_cmp(&score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let path_a = a.graph_path_len.unwrap_or(usize::MAX);
                    let path_b = b.graph_path_len.unwrap_or(usize::MAX);
                    path_a.cmp(&path_b)
                })
        });
    }
}

fn node_to_item(node: Node, path_len: usize) -> HybridItem {
    HybridItem {
        source: Source::Graph,
        content: None,
        vector_score: None,
        graph_path_len: Some(path_len),
        vector_id: node.vector_id.clone(),
        graph_entity_id: Some(node.id.clone()),
        metadata: node.properties.clone(),
    }
}
