//! Test Orchestrator Harness
//!
//! Builds a fully in-memory `Orchestrator` (hash-seeded embedder,
//! `InMemoryVectorStore`, `InMemoryGraphStore`) for scenario tests, with no
//! network or filesystem access.

mod memory_harness;

pub use memory_harness::TestHarness;
