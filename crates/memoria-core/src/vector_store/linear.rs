//! Linear-scan vector store
//!
//! A `RwLock`-guarded `HashMap` plus a full scan on search. Correct by
//! construction (exactly monotonic in `top_k`, unlike an ANN index), and
//! the spec explicitly allows a linear scan "up to tens of thousands" of
//! vectors.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{Filter, VectorRecord, VectorStore, VectorStoreError};

/// Linear-scan, exact `VectorStore` implementation.
pub struct InMemoryVectorStore {
    dimension: usize,
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl InMemoryVectorStore {
    /// Create an empty store fixed at dimension `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl VectorStore for InMemoryVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn add(
        &self,
        id: &str,
        vector: Vec<f32>,
        payload: serde_json::Value,
    ) -> Result<(), VectorStoreError> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        let record = VectorRecord {
            id: id.to_string(),
            vector,
            payload,
        };
        let mut records = self.records.write().expect("vector store lock poisoned");
        records.insert(id.to_string(), record);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<VectorRecord, VectorStoreError> {
        let records = self.records.read().expect("vector store lock poisoned");
        records
            .get(id)
            .cloned()
            .ok_or_else(|| VectorStoreError::NotFound(id.to_string()))
    }

    fn delete(&self, id: &str) -> Result<(), VectorStoreError> {
        let mut records = self.records.write().expect("vector store lock poisoned");
        records.remove(id);
        Ok(())
    }

    fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<Filter<'_>>,
    ) -> Result<Vec<(String, f32, serde_json::Value)>, VectorStoreError> {
        if query.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }

        let records = self.records.read().expect("vector store lock poisoned");
        let mut scored: Vec<(String, f32, serde_json::Value)> = records
            .values()
            .filter(|r| filter.is_none_or(|f| f(&r.payload)))
            .map(|r| {
                let score = crate::embeddings::cosine_similarity(query, &r.vector);
                (r.id.clone(), score, r.payload.clone())
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    fn len(&self) -> usize {
        self.records.read().expect("vector store lock poisoned").len()
    }
}
