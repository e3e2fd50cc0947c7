//! Crate-wide error type
//!
//! Each subsystem (embeddings, vector store, graph store, orchestrator) owns
//! a focused `thiserror` enum; this module unifies them at the boundary the
//! Orchestrator exposes to callers, matching the teacher's pattern of
//! `StorageError` wrapping lower-level failures with `#[from]`.

use crate::embeddings::EmbeddingError;
use crate::graph_store::GraphStoreError;
use crate::vector_store::VectorStoreError;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error kind for the memory engine.
///
/// Mirrors the error-kind vocabulary from the specification:
/// `DimensionMismatch`, `NotFound`, `EndpointMissing`, `ConstraintViolation`,
/// `BackendUnavailable`, `Timeout`, `InvalidArgument`, `SchemaValidation`.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Embedding vector dimension did not match the process-wide constant `D`.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Configured embedding dimension.
        expected: usize,
        /// Dimension actually observed.
        got: usize,
    },

    /// Requested id does not exist in the target store.
    #[error("not found: {0}")]
    NotFound(String),

    /// An edge referenced a node id that does not exist.
    #[error("endpoint missing: {0}")]
    EndpointMissing(String),

    /// A structural invariant of a store was violated.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A required backend (vector store or graph store) is unavailable.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// An operation exceeded its allotted deadline.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Caller supplied an invalid argument (e.g. negative budget).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A persisted document failed schema validation on load.
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    /// Propagated from the embedding backend.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Propagated from a `VectorStore` implementation.
    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),

    /// Propagated from a `GraphStore` implementation.
    #[error(transparent)]
    GraphStore(#[from] GraphStoreError),
}
