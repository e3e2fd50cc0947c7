//! Embedding backends
//!
//! `LocalEmbedder` wraps `fastembed` for local ONNX inference; `HashEmbedder`
//! is the deterministic fallback mandated when no real model is available.

use std::hash::{Hash, Hasher};

#[cfg(feature = "embeddings")]
use std::sync::{Mutex, OnceLock};

/// Default process-wide embedding dimension `D`.
pub const EMBEDDING_DIMENSIONS: usize = 384;

/// Maximum text length submitted to the model (longer inputs are truncated).
pub const MAX_TEXT_LENGTH: usize = 8192;

/// Batch size for efficient embedding generation.
pub const BATCH_SIZE: usize = 32;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Embedding error types.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbeddingError {
    /// Failed to initialize the embedding model.
    #[error("model initialization failed: {0}")]
    ModelInit(String),
    /// Failed to generate an embedding.
    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),
    /// Invalid input (empty text, etc).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The embedding's dimension did not match the expected constant `D`.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Dimension actually produced.
        got: usize,
    },
}

// ============================================================================
// EMBEDDER TRAIT
// ============================================================================

/// Capability interface for text-to-vector embedding.
///
/// Implementations must return unit L2-normalized vectors of a fixed
/// dimension ([`Embedder::dimension`]); mixing dimensions across calls to the
/// same store is a caller error, surfaced as [`EmbeddingError::DimensionMismatch`].
pub trait Embedder: Send + Sync {
    /// The fixed dimension `D` every vector this embedder produces will have.
    fn dimension(&self) -> usize;

    /// Embed a single piece of text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed a batch of texts. The default implementation embeds one at a
    /// time; backends with native batch support should override this.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Cosine similarity between two vectors of this embedder's dimension.
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }

    /// Whether this embedder is the deterministic, non-semantic fallback.
    /// Implementations that wrap a real model must return `false`.
    fn is_deterministic_fallback(&self) -> bool {
        false
    }
}

// ============================================================================
// DETERMINISTIC HASH-SEEDED FALLBACK
// ============================================================================

/// Deterministic, hash-seeded pseudo-random embedder.
///
/// Exists solely so the system functions without a model at development
/// time. It has no semantic meaning: similarity scores against it are
/// informational only. The same text always yields the same vector.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create a fallback embedder producing vectors of `dimension` dims.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIMENSIONS)
    }
}

impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "text cannot be empty".to_string(),
            ));
        }
        Ok(hash_seeded_vector(text, self.dimension))
    }

    fn is_deterministic_fallback(&self) -> bool {
        true
    }
}

/// Derive a deterministic unit vector from `text` using a splitmix64-style
/// generator seeded by the text's hash, one stream per output dimension so
/// that truncating or extending `dim` doesn't perturb earlier components.
fn hash_seeded_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    let base_seed = hasher.finish();

    let mut vector = Vec::with_capacity(dim);
    for i in 0..dim {
        let mut state = base_seed ^ splitmix64(i as u64);
        state = splitmix64(state);
        // Map to [-1, 1]
        let component = (state as f64 / u64::MAX as f64) * 2.0 - 1.0;
        vector.push(component as f32);
    }

    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

/// SplitMix64 step function — fast, well-distributed, deterministic.
#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

// ============================================================================
// LOCAL MODEL-BACKED EMBEDDER (fastembed)
// ============================================================================

#[cfg(feature = "embeddings")]
mod fastembed_backend {
    use super::*;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    /// Dimension produced by the bundled `AllMiniLML6V2` model — matches the
    /// crate's default `D` so stores don't need any truncation step.
    pub const MODEL_DIMENSIONS: usize = 384;

    static EMBEDDING_MODEL_RESULT: OnceLock<Result<Mutex<TextEmbedding>, String>> =
        OnceLock::new();

    fn get_cache_dir() -> std::path::PathBuf {
        if let Ok(path) = std::env::var("MEMORIA_EMBEDDING_CACHE") {
            return std::path::PathBuf::from(path);
        }
        if let Some(proj_dirs) = directories::ProjectDirs::from("dev", "memoria", "core") {
            return proj_dirs.cache_dir().join("fastembed");
        }
        if let Some(base_dirs) = directories::BaseDirs::new() {
            return base_dirs.home_dir().join(".cache/memoria/fastembed");
        }
        std::path::PathBuf::from(".fastembed_cache")
    }

    fn get_model() -> Result<std::sync::MutexGuard<'static, TextEmbedding>, EmbeddingError> {
        let result = EMBEDDING_MODEL_RESULT.get_or_init(|| {
            let cache_dir = get_cache_dir();
            if let Err(e) = std::fs::create_dir_all(&cache_dir) {
                tracing::warn!("failed to create embedding cache dir {:?}: {}", cache_dir, e);
            }

            let options = InitOptions::new(EmbeddingModel::AllMiniLML6V2)
                .with_show_download_progress(false)
                .with_cache_dir(cache_dir);

            TextEmbedding::try_new(options).map(Mutex::new).map_err(|e| {
                format!(
                    "failed to initialize AllMiniLM-L6-v2 embedding model: {}. \
                     falling back to deterministic hashing.",
                    e
                )
            })
        });

        match result {
            Ok(model) => model
                .lock()
                .map_err(|e| EmbeddingError::ModelInit(format!("lock poisoned: {e}"))),
            Err(err) => Err(EmbeddingError::ModelInit(err.clone())),
        }
    }

    /// Local, model-backed embedder using `fastembed` (ONNX, CPU/GPU).
    ///
    /// The two-level fallback described by the specification lives in
    /// [`super::FallbackEmbedder`], which tries this backend first and drops
    /// to [`super::HashEmbedder`] silently on any error.
    pub struct LocalEmbedder;

    impl Default for LocalEmbedder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl LocalEmbedder {
        /// Construct a new local embedder. Model download/initialization is
        /// lazy and happens on first call to [`Embedder::embed`].
        pub fn new() -> Self {
            Self
        }

        /// Eagerly initialize the model, surfacing any initialization error.
        pub fn init(&self) -> Result<(), EmbeddingError> {
            get_model().map(|_| ())
        }

        /// Whether the model is ready (already initialized or initializes
        /// successfully now).
        pub fn is_ready(&self) -> bool {
            get_model().is_ok()
        }
    }

    impl Embedder for LocalEmbedder {
        fn dimension(&self) -> usize {
            MODEL_DIMENSIONS
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.is_empty() {
                return Err(EmbeddingError::InvalidInput(
                    "text cannot be empty".to_string(),
                ));
            }
            let mut model = get_model()?;
            let text = if text.len() > MAX_TEXT_LENGTH {
                &text[..MAX_TEXT_LENGTH]
            } else {
                text
            };
            let embeddings = model
                .embed(vec![text], None)
                .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;
            embeddings
                .into_iter()
                .next()
                .map(normalize)
                .ok_or_else(|| EmbeddingError::EmbeddingFailed("no embedding generated".into()))
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if texts.is_empty() {
                return Ok(vec![]);
            }
            let mut model = get_model()?;
            let mut out = Vec::with_capacity(texts.len());
            for chunk in texts.chunks(BATCH_SIZE) {
                let truncated: Vec<&str> = chunk
                    .iter()
                    .map(|t| if t.len() > MAX_TEXT_LENGTH { &t[..MAX_TEXT_LENGTH] } else { *t })
                    .collect();
                let embeddings = model
                    .embed(truncated, None)
                    .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;
                out.extend(embeddings.into_iter().map(normalize));
            }
            Ok(out)
        }
    }

    fn normalize(mut v: Vec<f32>) -> Vec<f32> {
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[cfg(feature = "embeddings")]
pub use fastembed_backend::LocalEmbedder;

/// Two-level fallback embedder: tries a real model first, falls back to the
/// deterministic hash-seeded embedder silently on any initialization or
/// inference error.
pub struct FallbackEmbedder {
    #[cfg(feature = "embeddings")]
    primary: LocalEmbedder,
    fallback: HashEmbedder,
}

impl FallbackEmbedder {
    /// Build a fallback embedder targeting dimension `dim` for the
    /// hash-seeded path (the real model's native dimension is used whenever
    /// it is available).
    pub fn new(dim: usize) -> Self {
        Self {
            #[cfg(feature = "embeddings")]
            primary: LocalEmbedder::new(),
            fallback: HashEmbedder::new(dim),
        }
    }
}

impl Embedder for FallbackEmbedder {
    fn dimension(&self) -> usize {
        self.fallback.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        #[cfg(feature = "embeddings")]
        {
            match self.primary.embed(text) {
                Ok(v) => return Ok(v),
                Err(e) => {
                    tracing::warn!(
                        "local embedding model unavailable, using deterministic fallback: {e}"
                    );
                }
            }
        }
        self.fallback.embed(text)
    }

    fn is_deterministic_fallback(&self) -> bool {
        #[cfg(feature = "embeddings")]
        {
            !self.primary.is_ready()
        }
        #[cfg(not(feature = "embeddings"))]
        {
            true
        }
    }
}

// ============================================================================
// SIMILARITY FUNCTIONS
// ============================================================================

/// Compute cosine similarity between two vectors.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator > 0.0 {
        (dot_product / denominator).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Compute Euclidean distance between two vectors.
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::MAX;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Compute the dot product of two vectors.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.0001);
    }

    #[test]
    fn cosine_similarity_opposite() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-1.0, -2.0, -3.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 0.0001);
    }

    #[test]
    fn hash_embedder_is_deterministic() {
        let e = HashEmbedder::new(64);
        let v1 = e.embed("the mitochondria is the powerhouse of the cell").unwrap();
        let v2 = e.embed("the mitochondria is the powerhouse of the cell").unwrap();
        assert_eq!(v1, v2);
    }

    #[test]
    fn hash_embedder_differs_for_different_text() {
        let e = HashEmbedder::new(64);
        let v1 = e.embed("alpha").unwrap();
        let v2 = e.embed("beta").unwrap();
        assert_ne!(v1, v2);
    }

    #[test]
    fn hash_embedder_produces_unit_vectors() {
        let e = HashEmbedder::new(32);
        let v = e.embed("unit norm check").unwrap();
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[test]
    fn hash_embedder_rejects_empty_input() {
        let e = HashEmbedder::new(32);
        assert!(e.embed("").is_err());
    }

    #[test]
    fn hash_embedder_reports_deterministic_fallback() {
        let e = HashEmbedder::new(32);
        assert!(e.is_deterministic_fallback());
    }
}
