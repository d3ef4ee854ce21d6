//! DocumentStore trait — abstract interface over vector storage backends.
//!
//! Two implementations ship with the crate: `InMemoryDocumentStore` in the
//! `memory` module and `SqliteDocumentStore` in the `sqlite` module.

use async_trait::async_trait;
use uuid::Uuid;

use super::types::{Chunk, Document, DocumentStatus, DocumentType, ScoredChunk};
use crate::core::errors::RagError;

/// Abstract trait for document storage backends.
///
/// Implementations must guarantee:
/// - a reader never observes a partially written chunk (atomic upsert per chunk)
/// - `search` results are ordered by descending score, ties broken by
///   insertion order, so a fixed store state always yields the same ranking
/// - no lock is held across an `.await`
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a chunk (its embedding travels inside the record).
    /// Re-upserting an existing id replaces it but keeps its original
    /// insertion rank.
    async fn upsert(&self, chunk: Chunk) -> Result<(), RagError>;

    /// Insert many chunks. Each chunk is individually atomic; backends may
    /// additionally make the whole batch atomic.
    async fn upsert_batch(&self, chunks: Vec<Chunk>) -> Result<(), RagError> {
        for chunk in chunks {
            self.upsert(chunk).await?;
        }
        Ok(())
    }

    /// Top-`k` chunks by cosine similarity to `query_embedding`, restricted to
    /// `filter` when present.
    async fn search(
        &self,
        query_embedding: &[f32],
        filter: Option<DocumentType>,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError>;

    async fn get_chunk(&self, chunk_id: Uuid) -> Result<Option<Chunk>, RagError>;

    /// Number of stored chunks, optionally restricted to one document type.
    async fn count(&self, filter: Option<DocumentType>) -> Result<usize, RagError>;

    /// Register a new document record. Fails with `RagError::Store` when a
    /// document with the same id already exists; records are only changed
    /// through `set_document_status` and `delete_document`.
    async fn put_document(&self, document: Document) -> Result<(), RagError>;

    async fn get_document(&self, document_id: Uuid) -> Result<Option<Document>, RagError>;

    async fn list_documents(&self) -> Result<Vec<Document>, RagError>;

    /// Move a document to `status`. Fails with `RagError::Store` when the
    /// document is unknown or the transition is not allowed.
    async fn set_document_status(
        &self,
        document_id: Uuid,
        status: DocumentStatus,
    ) -> Result<(), RagError>;

    /// Remove a document and all of its chunks. Returns the number of chunks
    /// removed.
    async fn delete_document(&self, document_id: Uuid) -> Result<usize, RagError>;
}

pub(crate) fn illegal_transition(
    document_id: Uuid,
    from: DocumentStatus,
    to: DocumentStatus,
) -> RagError {
    RagError::Store(format!(
        "document {} cannot move from {} to {}",
        document_id,
        from.as_str(),
        to.as_str()
    ))
}

pub(crate) fn unknown_document(document_id: Uuid) -> RagError {
    RagError::Store(format!("document not found: {}", document_id))
}

pub(crate) fn duplicate_document(document_id: Uuid) -> RagError {
    RagError::Store(format!("document already registered: {}", document_id))
}
