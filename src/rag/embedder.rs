//! Text → vector conversion.
//!
//! `LlmEmbedder` calls the configured provider's embeddings endpoint;
//! `HashedEmbedder` is a deterministic, offline feature-hashing embedder used
//! when no embedding model is configured and throughout the tests.

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::core::errors::RagError;
use crate::llm::LlmProvider;
use crate::vector_math;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("embedder returned no vector".to_string()))
    }

    /// Embed several texts; the output has one vector per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Width of every produced vector.
    fn dimensions(&self) -> usize;
}

pub struct LlmEmbedder {
    provider: Arc<dyn LlmProvider>,
    model_id: String,
    dimensions: usize,
}

impl LlmEmbedder {
    pub fn new(provider: Arc<dyn LlmProvider>, model_id: impl Into<String>, dimensions: usize) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for LlmEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self
            .provider
            .embed(texts, &self.model_id)
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        if vectors.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "embedding count mismatch: {} inputs, {} vectors",
                texts.len(),
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(RagError::Embedding(format!(
                "expected {} dimensions from {}, got {}",
                self.dimensions,
                self.model_id,
                bad.len()
            )));
        }

        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Bag-of-words feature hashing: each lowercase alphanumeric token is hashed
/// with SHA-256 into a bucket and a sign, and the result is L2-normalised.
/// Identical texts always produce identical vectors.
pub struct HashedEmbedder {
    dimensions: usize,
}

impl HashedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0_u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        vector_math::normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl Embedder for HashedEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}
