//! Embedding provider abstraction and the deterministic stub provider.
//!
//! The stub provider derives a seed from each text's SHA-256 digest and
//! draws a unit-normalized standard-normal vector from that seed, so
//! identical text always yields an identical vector across calls and
//! process runs. It is a placeholder for a real embedding model, not an
//! approximation of one; requesting any other provider fails with
//! [`Error::NotSupported`] rather than silently degrading.
//!
//! Also provides the vector utilities used by the SQLite store:
//! - [`vec_to_blob`] / [`blob_to_vec`] — little-endian f32 BLOB encoding
//! - [`l2_distance`] — Euclidean distance between two embedding vectors

use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Default embedding dimensionality, matching common hosted models.
pub const DEFAULT_DIMS: usize = 1536;

/// Trait for embedding backends.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the provider identifier (e.g. `"stub"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality.
    fn dims(&self) -> usize;

    /// Embed a batch of texts: one unit vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

impl std::fmt::Debug for dyn EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingProvider")
            .field("model", &self.model_name())
            .field("dims", &self.dims())
            .finish()
    }
}

/// Deterministic hash-seeded embedding provider.
pub struct StubProvider {
    dims: usize,
}

impl StubProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn hash_embed(&self, text: &str) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(text_seed(text));
        let mut vector: Vec<f32> = (0..self.dims).map(|_| standard_normal(&mut rng)).collect();
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for StubProvider {
    fn model_name(&self) -> &str {
        "stub"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.hash_embed(t)).collect())
    }
}

/// Stable seed for a text: the first 8 bytes of its SHA-256 digest,
/// reduced modulo 2^32. Pure function of the content — never tied to
/// process-random state.
fn text_seed(text: &str) -> u64 {
    let digest = Sha256::digest(text.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes) % (1 << 32)
}

/// Standard-normal draw via the Box-Muller transform over the seeded
/// uniform stream.
fn standard_normal(rng: &mut StdRng) -> f32 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen();
    ((-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()) as f32
}

/// Create the provider named in the configuration.
///
/// Only the deterministic `"stub"` provider is implemented. Other names
/// (`"openai"`, `"local"`, ...) are a deliberate extension point and fail
/// with `NotSupported`.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "stub" => Ok(Arc::new(StubProvider::new(config.dims))),
        other => Err(Error::not_supported(format!(
            "embedding provider '{}'",
            other
        ))),
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector. Reverses [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Euclidean (L2) distance between two embedding vectors.
///
/// Returns `f32::MAX` for mismatched lengths so malformed rows sort last
/// instead of winning a nearest-neighbor query.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::MAX;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub() -> StubProvider {
        StubProvider::new(64)
    }

    #[tokio::test]
    async fn same_text_yields_identical_vectors() {
        let provider = stub();
        let a = provider.embed(&["abc".to_string()]).await.unwrap();
        let b = provider.embed(&["abc".to_string()]).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn different_texts_yield_different_vectors() {
        let provider = stub();
        let out = provider
            .embed(&["abc".to_string(), "abd".to_string()])
            .await
            .unwrap();
        assert_ne!(out[0], out[1]);
    }

    #[tokio::test]
    async fn vectors_are_unit_norm() {
        let provider = stub();
        let out = provider
            .embed(&["hello world".to_string()])
            .await
            .unwrap();
        let norm: f32 = out[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6, "norm was {}", norm);
    }

    #[tokio::test]
    async fn output_aligns_with_input_order() {
        let provider = stub();
        let texts = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let out = provider.embed(&texts).await.unwrap();
        assert_eq!(out.len(), 3);
        let single = provider.embed(&["two".to_string()]).await.unwrap();
        assert_eq!(out[1], single[0]);
    }

    #[tokio::test]
    async fn dims_match_configuration() {
        let provider = StubProvider::new(DEFAULT_DIMS);
        let out = provider.embed(&["x".to_string()]).await.unwrap();
        assert_eq!(out[0].len(), DEFAULT_DIMS);
    }

    #[test]
    fn non_stub_provider_is_not_supported() {
        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            ..Default::default()
        };
        let err = create_provider(&config).unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[test]
    fn blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        assert_eq!(blob_to_vec(&vec_to_blob(&vec)), vec);
    }

    #[test]
    fn l2_of_identical_vectors_is_zero() {
        let v = vec![0.6f32, 0.8];
        assert!(l2_distance(&v, &v) < 1e-6);
    }

    #[test]
    fn l2_of_mismatched_lengths_sorts_last() {
        assert_eq!(l2_distance(&[1.0], &[1.0, 2.0]), f32::MAX);
    }

    #[test]
    fn seed_is_a_pure_function_of_content() {
        assert_eq!(text_seed("abc"), text_seed("abc"));
        assert_ne!(text_seed("abc"), text_seed("abd"));
        assert!(text_seed("abc") < (1 << 32));
    }
}
