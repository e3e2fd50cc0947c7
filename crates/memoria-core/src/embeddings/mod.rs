//! Semantic Embeddings
//!
//! Maps text to a fixed-dimension, L2-normalized vector via the `Embedder`
//! trait. Two backends are provided:
//!
//! - [`LocalEmbedder`]: local ONNX inference via `fastembed` (feature
//!   `embeddings`).
//! - [`HashEmbedder`]: a deterministic hash-seeded fallback used when no real
//!   model is available. It carries no semantic meaning; similarity scores
//!   against it are informational only (see `query.embedding_present` on the
//!   context bundle).

mod local;

pub use local::{
    cosine_similarity, dot_product, euclidean_distance, Embedder, EmbeddingError,
    FallbackEmbedder, HashEmbedder, EMBEDDING_DIMENSIONS,
};

#[cfg(feature = "embeddings")]
pub use local::LocalEmbedder;
