//! Graph store capability
//!
//! `GraphStore` is the capability interface HybridLTM's structural half is
//! built on: typed nodes and directed typed edges, with traversal and a
//! small set of parameterized structural queries. The concrete
//! graph-database query language is explicitly out of scope — `GraphQuery`
//! is a typed enum of the structural queries the spec calls for (find by
//! property, bounded traversal, shortest path) rather than a string
//! template, matching the "no runtime type introspection" design note.

mod memory;

pub use memory::InMemoryGraphStore;

use serde::{Deserialize, Serialize};

/// Graph store error kinds.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphStoreError {
    /// No node/edge exists for the given id.
    #[error("not found: {0}")]
    NotFound(String),
    /// An edge referenced a node id that does not exist.
    #[error("endpoint missing: {0}")]
    EndpointMissing(String),
    /// A structural invariant was violated (e.g. duplicate id on create).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// A node in the property graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node id (the `entity_id` in the data model).
    pub id: String,
    /// Node label (e.g. `Function`, `Module`, `Commit`, `Bug`, `Concept`, `Doc`).
    pub label: String,
    /// Typed properties as a JSON object.
    pub properties: serde_json::Value,
    /// Cross-link to the vector record sharing this entity, if any.
    pub vector_id: Option<String>,
}

/// A directed, typed edge between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique edge id.
    pub id: String,
    /// Source node id.
    pub from_id: String,
    /// Target node id.
    pub to_id: String,
    /// Edge type, drawn from a documented vocabulary (CALLS, BELONGS_TO,
    /// MODIFIES, FIXES, AFFECTS, DEPENDS_ON, RELATED_TO, ...).
    pub edge_type: String,
    /// Edge properties as a JSON object.
    pub properties: serde_json::Value,
}

/// Which direction to traverse edges in `neighbors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow edges out of the starting node.
    Out,
    /// Follow edges into the starting node.
    In,
    /// Follow edges in either direction.
    Both,
}

/// A node reached during a `neighbors` traversal, with the edge path taken
/// to reach it from the starting node.
#[derive(Debug, Clone)]
pub struct NeighborMatch {
    /// The reached node.
    pub node: Node,
    /// Edges traversed from the start node to reach this one, in order.
    pub path: Vec<Edge>,
}

/// A parameterized structural query (find by property, bounded traversal,
/// shortest path) — the typed stand-in for "template + params" from the
/// specification.
#[derive(Debug, Clone)]
pub enum GraphQuery {
    /// Find nodes (optionally of a given label) with a matching property.
    FindByProperty {
        /// Restrict to nodes of this label, if set.
        label: Option<String>,
        /// Property key to match.
        key: String,
        /// Property value to match.
        value: serde_json::Value,
    },
    /// Traverse up to `max_depth` hops from `start`.
    Traverse {
        /// Starting node id.
        start: String,
        /// Restrict to this edge type, if set.
        edge_type: Option<String>,
        /// Traversal direction.
        direction: Direction,
        /// Maximum hop count.
        max_depth: usize,
    },
    /// Find the shortest path between two nodes (BFS, unweighted).
    ShortestPath {
        /// Starting node id.
        from: String,
        /// Target node id.
        to: String,
    },
}

/// A single row of a `query` result.
#[derive(Debug, Clone)]
pub struct GraphRow {
    /// The node this row represents.
    pub node: Node,
    /// The edge path from the query's anchor to this node (empty for
    /// `FindByProperty`).
    pub path: Vec<Edge>,
}

/// Capability interface for a typed property graph.
pub trait GraphStore: Send + Sync {
    /// Create a node, or update an existing node's properties when `id` is
    /// `Some` and already present. Returns the node's id.
    fn upsert_node(
        &self,
        label: &str,
        id: Option<&str>,
        properties: serde_json::Value,
    ) -> Result<String, GraphStoreError>;

    /// Create or update the edge `(from_id, to_id, edge_type)`. Fails with
    /// [`GraphStoreError::EndpointMissing`] if either node is absent.
    fn upsert_edge(
        &self,
        from_id: &str,
        to_id: &str,
        edge_type: &str,
        properties: Option<serde_json::Value>,
    ) -> Result<String, GraphStoreError>;

    /// Fetch a node by id.
    fn get_node(&self, id: &str) -> Result<Node, GraphStoreError>;

    /// Delete a node and every edge touching it. Used to roll back a
    /// partially-completed HybridLTM insertion; deleting an absent node is
    /// not an error.
    fn delete_node(&self, id: &str) -> Result<(), GraphStoreError>;

    /// Set (or clear) the `vector_id` cross-link on a node.
    fn set_vector_id(&self, id: &str, vector_id: Option<&str>) -> Result<(), GraphStoreError>;

    /// Breadth-first traversal from `id`, optionally filtered by edge type
    /// and direction, up to `max_depth` hops.
    fn neighbors(
        &self,
        id: &str,
        edge_type: Option<&str>,
        direction: Direction,
        max_depth: usize,
    ) -> Result<Vec<NeighborMatch>, GraphStoreError>;

    /// Run a parameterized structural query.
    fn query(&self, query: &GraphQuery) -> Result<Vec<GraphRow>, GraphStoreError>;

    /// Number of nodes currently stored.
    fn node_count(&self) -> usize;

    /// Number of edges currently stored.
    fn edge_count(&self) -> usize;
}
