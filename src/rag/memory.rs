//! In-memory [`DocumentStore`] implementation.
//!
//! Chunks live in a `Vec` behind a `std::sync::RwLock`, so their position in
//! the vector is their insertion rank. Vector search is brute-force cosine
//! similarity over every stored embedding.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::store::{duplicate_document, illegal_transition, unknown_document, DocumentStore};
use super::types::{Chunk, Document, DocumentStatus, DocumentType, ScoredChunk};
use crate::core::errors::RagError;
use crate::vector_math;

#[derive(Default)]
struct Inner {
    documents: Vec<Document>,
    chunks: Vec<Chunk>,
}

/// Process-local store; suitable for tests and single-process deployments.
pub struct InMemoryDocumentStore {
    inner: RwLock<Inner>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, RagError> {
        self.inner
            .read()
            .map_err(|_| RagError::Store("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, RagError> {
        self.inner
            .write()
            .map_err(|_| RagError::Store("in-memory store lock poisoned".to_string()))
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn upsert(&self, chunk: Chunk) -> Result<(), RagError> {
        let mut inner = self.write()?;
        match inner.chunks.iter_mut().find(|c| c.id == chunk.id) {
            Some(existing) => *existing = chunk,
            None => inner.chunks.push(chunk),
        }
        Ok(())
    }

    async fn upsert_batch(&self, chunks: Vec<Chunk>) -> Result<(), RagError> {
        let mut inner = self.write()?;
        for chunk in chunks {
            match inner.chunks.iter_mut().find(|c| c.id == chunk.id) {
                Some(existing) => *existing = chunk,
                None => inner.chunks.push(chunk),
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        filter: Option<DocumentType>,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let inner = self.read()?;
        let mut scored = Vec::new();
        for chunk in inner
            .chunks
            .iter()
            .filter(|c| DocumentType::matches(filter, c.document_type))
            .filter(|c| !c.embedding.is_empty())
        {
            let score = vector_math::cosine_similarity(query_embedding, &chunk.embedding)
                .map_err(|e| RagError::Store(format!("chunk {}: {}", chunk.id, e)))?;
            scored.push(ScoredChunk {
                chunk: chunk.clone(),
                score,
            });
        }
        drop(inner);

        vector_math::sort_scores_descending(&mut scored, |hit| hit.score);
        scored.truncate(k);
        Ok(scored)
    }

    async fn get_chunk(&self, chunk_id: Uuid) -> Result<Option<Chunk>, RagError> {
        let inner = self.read()?;
        Ok(inner.chunks.iter().find(|c| c.id == chunk_id).cloned())
    }

    async fn count(&self, filter: Option<DocumentType>) -> Result<usize, RagError> {
        let inner = self.read()?;
        Ok(inner
            .chunks
            .iter()
            .filter(|c| DocumentType::matches(filter, c.document_type))
            .count())
    }

    async fn put_document(&self, document: Document) -> Result<(), RagError> {
        let mut inner = self.write()?;
        if inner.documents.iter().any(|d| d.id == document.id) {
            return Err(duplicate_document(document.id));
        }
        inner.documents.push(document);
        Ok(())
    }

    async fn get_document(&self, document_id: Uuid) -> Result<Option<Document>, RagError> {
        let inner = self.read()?;
        Ok(inner.documents.iter().find(|d| d.id == document_id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>, RagError> {
        Ok(self.read()?.documents.clone())
    }

    async fn set_document_status(
        &self,
        document_id: Uuid,
        status: DocumentStatus,
    ) -> Result<(), RagError> {
        let mut inner = self.write()?;
        let document = inner
            .documents
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| unknown_document(document_id))?;
        if !document.status.can_transition_to(status) {
            return Err(illegal_transition(document_id, document.status, status));
        }
        document.status = status;
        Ok(())
    }

    async fn delete_document(&self, document_id: Uuid) -> Result<usize, RagError> {
        let mut inner = self.write()?;
        inner.documents.retain(|d| d.id != document_id);
        let before = inner.chunks.len();
        inner.chunks.retain(|c| c.document_id != document_id);
        Ok(before - inner.chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, embedding: Vec<f32>, doc: &Document) -> Chunk {
        Chunk::new(text, embedding, doc.id, doc.document_type, 0)
    }

    #[tokio::test]
    async fn search_orders_by_score_then_insertion() {
        let store = InMemoryDocumentStore::new();
        let doc = Document::new("a.pdf", DocumentType::Technical, 1);
        let first = chunk("first", vec![1.0, 0.0], &doc);
        let second = chunk("second", vec![2.0, 0.0], &doc);
        let off_axis = chunk("off", vec![0.5, 0.5], &doc);
        store
            .upsert_batch(vec![first.clone(), off_axis.clone(), second.clone()])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0], None, 10).await.unwrap();
        let ids: Vec<Uuid> = hits.iter().map(|h| h.chunk.id).collect();
        assert_eq!(ids, vec![first.id, second.id, off_axis.id]);
    }

    #[tokio::test]
    async fn search_respects_filter_and_k() {
        let store = InMemoryDocumentStore::new();
        let tech = Document::new("spec.pdf", DocumentType::Technical, 1);
        let grid = Document::new("grid.pdf", DocumentType::Grid, 1);
        store.upsert(chunk("t1", vec![1.0, 0.0], &tech)).await.unwrap();
        store.upsert(chunk("g1", vec![1.0, 0.0], &grid)).await.unwrap();
        store.upsert(chunk("g2", vec![0.9, 0.1], &grid)).await.unwrap();

        let hits = store
            .search(&[1.0, 0.0], Some(DocumentType::Grid), 1)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.text, "g1");
        assert_eq!(store.count(Some(DocumentType::Grid)).await.unwrap(), 2);
        assert_eq!(store.count(None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn reupsert_keeps_insertion_rank() {
        let store = InMemoryDocumentStore::new();
        let doc = Document::new("a.pdf", DocumentType::Market, 1);
        let a = chunk("a", vec![1.0, 0.0], &doc);
        let b = chunk("b", vec![1.0, 0.0], &doc);
        store.upsert(a.clone()).await.unwrap();
        store.upsert(b.clone()).await.unwrap();
        store.upsert(a.clone()).await.unwrap();

        let hits = store.search(&[1.0, 0.0], None, 2).await.unwrap();
        assert_eq!(hits[0].chunk.id, a.id);
        assert_eq!(hits[1].chunk.id, b.id);
    }

    #[tokio::test]
    async fn status_transitions_are_enforced() {
        let store = InMemoryDocumentStore::new();
        let doc = Document::new("a.pdf", DocumentType::Policy, 3);
        store.put_document(doc.clone()).await.unwrap();

        store
            .set_document_status(doc.id, DocumentStatus::Indexed)
            .await
            .unwrap();
        let err = store
            .set_document_status(doc.id, DocumentStatus::Failed)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Store(_)));

        let missing = store
            .set_document_status(Uuid::new_v4(), DocumentStatus::Indexed)
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn delete_document_removes_its_chunks() {
        let store = InMemoryDocumentStore::new();
        let keep = Document::new("keep.pdf", DocumentType::Grid, 1);
        let drop_doc = Document::new("drop.pdf", DocumentType::Grid, 1);
        store.put_document(keep.clone()).await.unwrap();
        store.put_document(drop_doc.clone()).await.unwrap();
        store.upsert(chunk("k", vec![1.0], &keep)).await.unwrap();
        store.upsert(chunk("d1", vec![1.0], &drop_doc)).await.unwrap();
        store.upsert(chunk("d2", vec![1.0], &drop_doc)).await.unwrap();

        assert_eq!(store.delete_document(drop_doc.id).await.unwrap(), 2);
        assert_eq!(store.count(None).await.unwrap(), 1);
        assert_eq!(store.list_documents().await.unwrap(), vec![keep]);
    }

    #[tokio::test]
    async fn registered_document_cannot_be_replaced() {
        let store = InMemoryDocumentStore::new();
        let doc = Document::new("a.pdf", DocumentType::Technical, 1);
        store.put_document(doc.clone()).await.unwrap();
        store
            .set_document_status(doc.id, DocumentStatus::Indexed)
            .await
            .unwrap();

        let err = store.put_document(doc.clone()).await.unwrap_err();
        assert!(matches!(err, RagError::Store(_)));
        let stored = store.get_document(doc.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Indexed);
    }
}
