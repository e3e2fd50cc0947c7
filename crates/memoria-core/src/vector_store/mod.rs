//! Vector store capability
//!
//! `VectorStore` is the capability interface HybridLTM's semantic half is
//! built on: insert `(id, vector, payload)` triples, search by cosine
//! similarity. Two backends are provided, both behind the same trait so the
//! Orchestrator and HybridLTM never need to know which is active:
//!
//! - [`InMemoryVectorStore`] — linear scan, always exactly monotonic in
//!   `top_k` (the spec's invariant). Used by default.
//! - [`AnnVectorStore`] (feature `vector-search`) — USearch HNSW index for
//!   large corpora; approximate, so not guaranteed monotonic, but far
//!   faster at scale.

mod ann;
mod linear;

pub use linear::InMemoryVectorStore;

#[cfg(feature = "vector-search")]
pub use ann::AnnVectorStore;

use serde::{Deserialize, Serialize};

/// A predicate over a vector record's payload, used to restrict `search` to
/// a subset of the store (e.g. by `category` or `project_id`).
pub type Filter<'a> = &'a (dyn Fn(&serde_json::Value) -> bool + Send + Sync);

/// Vector store error kinds.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum VectorStoreError {
    /// `vector.len()` did not equal the store's configured dimension `D`.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Configured dimension.
        expected: usize,
        /// Dimension of the offending vector.
        got: usize,
    },
    /// No record exists for the given id.
    #[error("not found: {0}")]
    NotFound(String),
    /// Underlying index failed to build, add, or search.
    #[error("index error: {0}")]
    Index(String),
}

/// A stored vector record, returned from `get` and as part of `search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Caller-assigned identifier (the `vector_id` in the data model).
    pub id: String,
    /// Unit-norm embedding of dimension `D`.
    pub vector: Vec<f32>,
    /// Arbitrary metadata: category, tags, file location, timestamps,
    /// `graph_entity_id` back-link, relationship declarations, etc.
    pub payload: serde_json::Value,
}

/// Capability interface for nearest-neighbor vector search.
pub trait VectorStore: Send + Sync {
    /// The fixed dimension `D` this store was configured for.
    fn dimension(&self) -> usize;

    /// Insert or overwrite a vector record.
    fn add(
        &self,
        id: &str,
        vector: Vec<f32>,
        payload: serde_json::Value,
    ) -> Result<(), VectorStoreError>;

    /// Fetch a record by id.
    fn get(&self, id: &str) -> Result<VectorRecord, VectorStoreError>;

    /// Remove a record by id. Removing an absent id is not an error.
    fn delete(&self, id: &str) -> Result<(), VectorStoreError>;

    /// Nearest-neighbor search by cosine similarity, descending, at most
    /// `top_k` results, optionally restricted by `filter` over payload.
    fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<Filter<'_>>,
    ) -> Result<Vec<(String, f32, serde_json::Value)>, VectorStoreError>;

    /// Number of records currently stored.
    fn len(&self) -> usize;

    /// Whether the store holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
