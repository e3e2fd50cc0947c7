//! Snapshot persistence
//!
//! STM and MTM state as a single JSON-shaped document. VectorStore and
//! GraphStore persist through their own backends; the snapshot only
//! references the configured embedding dimension, never store contents.

use serde::{Deserialize, Serialize};

use crate::mtm::Chunk;
use crate::stm::Turn;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted STM + MTM state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version.
    pub version: u32,
    /// STM turns, in insertion order.
    pub stm: Vec<Turn>,
    /// MTM chunks, in insertion order.
    pub mtm: Vec<Chunk>,
    /// Promotion counters.
    pub counters: Counters,
    /// Embedding dimension `D` this snapshot was captured under.
    pub embedding_dim: usize,
}

/// Counters carried in a snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Counters {
    /// Turns ingested since the last STM→MTM promotion.
    pub turns_since_last_summary: usize,
}

/// Serialize a snapshot to a JSON string.
pub fn save(snapshot: &Snapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string(snapshot)
}

/// Deserialize a snapshot from a JSON string. Per the propagation policy,
/// load failures are reported via the `Result`, not a panic, so callers can
/// fall back to a fresh state.
pub fn load(data: &str) -> Result<Snapshot, serde_json::Error> {
    serde_json::from_str(data)
}
