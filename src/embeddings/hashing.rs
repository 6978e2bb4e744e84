use async_trait::async_trait;
use sha2::Digest;
use sha2::Sha256;

use super::Embedder;
use crate::errors::FeedbackRagError;
use crate::errors::Result;

/// Identifier prefix for vectors produced by [`HashingEmbedder`]
pub const HASHING_MODEL_PREFIX: &str = "feature-hashing-v1";

/// Deterministic embedder that hashes lowercase tokens into signed buckets.
///
/// Token hashes come from SHA-256, so vectors are identical across runs,
/// platforms, and releases. Output is L2-normalized; texts with no tokens
/// produce the zero vector. Useful offline and in tests; it captures lexical
/// overlap rather than meaning.
///
/// The reported model name is `feature-hashing-v1/<dimension>`, so an index
/// built by a neural model never loads against it.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    model_name: String,
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(FeedbackRagError::ConfigError(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            model_name: Self::model_id(dimension),
            dimension,
        })
    }

    /// Model identifier written into indexes built with this embedder
    #[must_use]
    pub fn model_id(dimension: usize) -> String {
        format!("{HASHING_MODEL_PREFIX}/{dimension}")
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&digest[..8]);
        let hash = u64::from_le_bytes(raw);
        let idx = (hash % self.dimension as u64) as usize;
        // Top bit picks the sign so unrelated tokens tend to cancel out
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        (idx, sign)
    }

    /// Synchronous core, shared with tooling that builds fixture indexes
    #[must_use]
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in Self::tokenize(text) {
            let (idx, sign) = self.bucket(&token);
            vector[idx] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
