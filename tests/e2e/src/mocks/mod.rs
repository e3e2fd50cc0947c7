//! Test Data Factory
//!
//! Small content generators for scenario tests: realistic-looking turn and
//! fact text, with enough lexical variety to exercise keyword extraction,
//! intent classification, and dedup without needing a real embedding model.

mod fixtures;

pub use fixtures::TestDataFactory;
