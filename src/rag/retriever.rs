//! Retriever: query text in, ranked chunks out.

use std::sync::Arc;

use super::embedder::Embedder;
use super::store::DocumentStore;
use super::types::{DocumentType, ScoredChunk};
use crate::core::errors::RagError;

pub struct Retriever {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    min_score: Option<f32>,
}

impl Retriever {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            min_score: None,
        }
    }

    /// Drop hits scoring below `min_score` after ranking.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Embed `query` and return the top `k` chunks by descending similarity,
    /// restricted to `filter` when present.
    ///
    /// Embedding and store failures are reported as `RagError::Retrieval`
    /// and are not retried.
    pub async fn retrieve(
        &self,
        query: &str,
        filter: Option<DocumentType>,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidInput("query must not be blank".to_string()));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| RagError::Retrieval(format!("query embedding failed: {}", e)))?;

        let mut hits = self
            .store
            .search(&query_embedding, filter, k)
            .await
            .map_err(|e| RagError::Retrieval(format!("store search failed: {}", e)))?;

        if let Some(floor) = self.min_score {
            hits.retain(|hit| hit.score >= floor);
        }

        tracing::debug!(
            "Retrieved {} chunks (k={}, filter={:?})",
            hits.len(),
            k,
            filter.map(|f| f.as_str())
        );
        Ok(hits)
    }
}
