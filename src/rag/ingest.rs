//! Ingestion pipeline: extracted page text → chunks → embeddings → store.
//!
//! Rendering and OCR happen upstream; this module starts from plain page
//! text and drives the document through `processing → indexed` (or
//! `processing → failed` when any step errors).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::embedder::Embedder;
use super::store::DocumentStore;
use super::types::{Chunk, Document, DocumentStatus};
use crate::core::config::settings::IngestionSettings;
use crate::core::errors::RagError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
    /// Texts per embedding call
    pub embed_batch_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::from(&IngestionSettings::default())
    }
}

impl From<&IngestionSettings> for ChunkingConfig {
    fn from(settings: &IngestionSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size.max(1),
            chunk_overlap: settings.chunk_overlap,
            embed_batch_size: settings.embed_batch_size.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub document_id: Uuid,
    pub chunk_count: usize,
    pub status: DocumentStatus,
}

pub struct IngestionPipeline {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    config: ChunkingConfig,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
        config: ChunkingConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Index `pages` for `document`.
    ///
    /// The document must be new to the store. It is registered as
    /// `processing`, chunked page by page (position indices run across the
    /// whole document) and embedded in batches; the chunks are written in one
    /// batch only after every embedding succeeded. On success it moves to
    /// `indexed`; on any failure it is marked `failed`, keeps no chunks and
    /// the original error is returned.
    pub async fn ingest(
        &self,
        document: Document,
        pages: &[String],
    ) -> Result<IngestionReport, RagError> {
        if document.status != DocumentStatus::Processing {
            return Err(RagError::InvalidInput(format!(
                "document {} must be ingested from processing, found {}",
                document.id,
                document.status.as_str()
            )));
        }

        let document_id = document.id;
        if let Some(existing) = self.store.get_document(document_id).await? {
            return Err(RagError::InvalidInput(format!(
                "document {} is already registered as {}",
                document_id,
                existing.status.as_str()
            )));
        }

        tracing::info!(
            "Ingesting document {} ({}, {} pages)",
            document.filename,
            document.document_type,
            pages.len()
        );
        self.store.put_document(document.clone()).await?;

        match self.index_pages(&document, pages).await {
            Ok(chunk_count) => {
                self.store
                    .set_document_status(document_id, DocumentStatus::Indexed)
                    .await?;
                tracing::info!("Indexed document {} with {} chunks", document_id, chunk_count);
                Ok(IngestionReport {
                    document_id,
                    chunk_count,
                    status: DocumentStatus::Indexed,
                })
            }
            Err(err) => {
                tracing::error!("Ingestion of document {} failed: {}", document_id, err);
                if let Err(status_err) = self
                    .store
                    .set_document_status(document_id, DocumentStatus::Failed)
                    .await
                {
                    tracing::warn!(
                        "Could not mark document {} as failed: {}",
                        document_id,
                        status_err
                    );
                }
                Err(err)
            }
        }
    }

    async fn index_pages(&self, document: &Document, pages: &[String]) -> Result<usize, RagError> {
        let texts: Vec<String> = pages
            .iter()
            .flat_map(|page| self.split_into_chunks(page))
            .collect();

        let mut chunks = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.embed_batch_size) {
            let vectors = self.embedder.embed_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "embedding count mismatch: {} inputs, {} vectors",
                    batch.len(),
                    vectors.len()
                )));
            }

            for (text, embedding) in batch.iter().zip(vectors) {
                let position = u32::try_from(chunks.len()).map_err(RagError::internal)?;
                chunks.push(Chunk::new(
                    text.clone(),
                    embedding,
                    document.id,
                    document.document_type,
                    position,
                ));
            }
        }

        self.store.upsert_batch(chunks).await?;
        Ok(texts.len())
    }

    /// Split text into overlapping chunks of at most `chunk_size`
    /// characters, preferring to cut after a sentence terminator in the last
    /// fifth of each window.
    pub fn split_into_chunks(&self, text: &str) -> Vec<String> {
        let chunk_size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap.min(chunk_size.saturating_sub(1));

        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total_chars {
            let end = (start + chunk_size).min(total_chars);
            let cut = if end < total_chars {
                find_sentence_boundary(&chars[start..end]).unwrap_or(end - start)
            } else {
                end - start
            };

            let piece: String = chars[start..start + cut].iter().collect();
            let piece = piece.trim();
            if !piece.is_empty() {
                chunks.push(piece.to_string());
            }

            if start + cut >= total_chars {
                break;
            }
            start = (start + cut).saturating_sub(overlap).max(start + 1);
        }

        chunks
    }
}

/// Length of the window up to and including the last sentence terminator
/// that is followed by whitespace, searched in the last 20% of the window.
fn find_sentence_boundary(window: &[char]) -> Option<usize> {
    let search_start = (window.len() * 80) / 100;
    (search_start..window.len().saturating_sub(1))
        .rev()
        .find(|&i| matches!(window[i], '.' | '!' | '?') && window[i + 1].is_whitespace())
        .map(|i| i + 1)
}
