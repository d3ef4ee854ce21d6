//! Document lifecycle: ingest, query, failure marking and deletion.

mod common;

use std::sync::Arc;

use async_trait::async_trait;

use adaptive_rag::graph::{Orchestrator, WorkflowComponents, WorkflowConfig};
use adaptive_rag::rag::{
    ChunkingConfig, Document, DocumentStatus, DocumentStore, DocumentType, Embedder,
    ExtractiveGenerator, HashedEmbedder, IngestionPipeline, KeywordRewriter, LexicalEvaluator,
    Retriever, SqliteDocumentStore,
};
use adaptive_rag::{RagError, Termination};

/// Embeds the first batch, then fails.
struct FlakyEmbedder {
    inner: HashedEmbedder,
    calls: std::sync::Mutex<usize>,
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if call > 1 {
            return Err(RagError::Embedding("model unloaded".to_string()));
        }
        self.inner.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

async fn sqlite_store(dir: &tempfile::TempDir) -> Arc<SqliteDocumentStore> {
    Arc::new(
        SqliteDocumentStore::with_path(dir.path().join("documents.db"))
            .await
            .unwrap(),
    )
}

fn small_chunks() -> ChunkingConfig {
    ChunkingConfig {
        chunk_size: 120,
        chunk_overlap: 20,
        embed_batch_size: 2,
    }
}

#[tokio::test]
async fn ingested_document_is_queryable() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let embedder = Arc::new(HashedEmbedder::new(common::DIMENSIONS));
    let pipeline = IngestionPipeline::new(store.clone(), embedder.clone(), small_chunks());

    let document = Document::new("panel-datasheet.pdf", DocumentType::Technical, 2);
    let pages = vec![
        "Monocrystalline module. Max power: 400W. Weight 21 kg.".to_string(),
        "Operating temperature from -40 to 85 degrees.".to_string(),
    ];
    let report = pipeline.ingest(document.clone(), &pages).await.unwrap();

    assert_eq!(report.status, DocumentStatus::Indexed);
    assert_eq!(report.chunk_count, 2);
    let stored = store.get_document(document.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DocumentStatus::Indexed);
    assert_eq!(store.count(Some(DocumentType::Technical)).await.unwrap(), 2);

    let orchestrator = Orchestrator::new(
        WorkflowComponents {
            retriever: Arc::new(Retriever::new(store, embedder)),
            evaluator: Arc::new(LexicalEvaluator::new()),
            rewriter: Arc::new(KeywordRewriter::new()),
            generator: Arc::new(ExtractiveGenerator::default()),
        },
        WorkflowConfig::default(),
    )
    .unwrap();

    let result = orchestrator
        .run("What is the maximum power output?", Some(DocumentType::Technical))
        .await
        .unwrap();
    assert_eq!(result.termination, Termination::Relevant);
    assert!(result.answer.contains("400W"));
    assert!(result
        .citations
        .iter()
        .all(|c| c.document_id == document.id));
}

#[tokio::test]
async fn position_indices_run_across_pages() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let embedder = Arc::new(HashedEmbedder::new(common::DIMENSIONS));
    let pipeline = IngestionPipeline::new(store.clone(), embedder.clone(), small_chunks());

    let document = Document::new("tariffs.pdf", DocumentType::Market, 3);
    let pages: Vec<String> = ["Page one.", "Page two.", "Page three."]
        .iter()
        .map(|p| p.to_string())
        .collect();
    pipeline.ingest(document, &pages).await.unwrap();

    let hits = store
        .search(&embedder.embed_text("page"), None, 10)
        .await
        .unwrap();
    let mut positions: Vec<u32> = hits.iter().map(|h| h.chunk.position_index).collect();
    positions.sort_unstable();
    assert_eq!(positions, vec![0, 1, 2]);
}

#[tokio::test]
async fn embedding_failure_marks_document_failed() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let embedder = Arc::new(FlakyEmbedder {
        inner: HashedEmbedder::new(common::DIMENSIONS),
        calls: std::sync::Mutex::new(0),
    });
    let pipeline = IngestionPipeline::new(store.clone(), embedder, small_chunks());

    let document = Document::new("audit.pdf", DocumentType::Regulatory, 3);
    let pages: Vec<String> = (0..3)
        .map(|i| format!("Section {} of the audit report.", i))
        .collect();
    let err = pipeline.ingest(document.clone(), &pages).await.unwrap_err();

    assert!(matches!(err, RagError::Embedding(_)));
    let stored = store.get_document(document.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DocumentStatus::Failed);
    // The first batch embedded fine but must not be searchable.
    assert_eq!(store.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn reingesting_the_same_document_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let embedder = Arc::new(HashedEmbedder::new(common::DIMENSIONS));
    let pipeline = IngestionPipeline::new(store.clone(), embedder, small_chunks());

    let document = Document::new("a.pdf", DocumentType::Technical, 1);
    let pages = vec!["Max power: 400W.".to_string()];
    pipeline.ingest(document.clone(), &pages).await.unwrap();

    let err = pipeline.ingest(document.clone(), &pages).await.unwrap_err();
    assert!(matches!(err, RagError::InvalidInput(_)));
    assert_eq!(store.count(None).await.unwrap(), 1);
    let stored = store.get_document(document.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DocumentStatus::Indexed);
}

#[tokio::test]
async fn terminal_statuses_cannot_change() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let embedder = Arc::new(HashedEmbedder::new(common::DIMENSIONS));
    let pipeline = IngestionPipeline::new(store.clone(), embedder, small_chunks());

    let document = Document::new("policy.pdf", DocumentType::Policy, 1);
    pipeline
        .ingest(document.clone(), &["Renewable targets for 2030.".to_string()])
        .await
        .unwrap();

    for next in [DocumentStatus::Processing, DocumentStatus::Failed] {
        let err = store
            .set_document_status(document.id, next)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Store(_)));
    }

    let mut already_indexed = Document::new("again.pdf", DocumentType::Policy, 1);
    already_indexed.status = DocumentStatus::Indexed;
    let err = pipeline
        .ingest(already_indexed, &["text".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::InvalidInput(_)));
}

#[tokio::test]
async fn deleting_a_document_removes_its_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let embedder = Arc::new(HashedEmbedder::new(common::DIMENSIONS));
    let pipeline = IngestionPipeline::new(store.clone(), embedder, small_chunks());

    let keep = Document::new("keep.pdf", DocumentType::Grid, 1);
    let stale = Document::new("stale.pdf", DocumentType::Grid, 1);
    pipeline
        .ingest(keep.clone(), &["Frequency must stay within 49.8 to 50.2 Hz.".to_string()])
        .await
        .unwrap();
    let report = pipeline
        .ingest(stale.clone(), &["Voltage ride-through for 150 ms.".to_string()])
        .await
        .unwrap();

    let removed = store.delete_document(stale.id).await.unwrap();
    assert_eq!(removed, report.chunk_count);
    assert_eq!(store.count(None).await.unwrap(), 1);
    assert!(store.get_document(stale.id).await.unwrap().is_none());

    let remaining = store.list_documents().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, keep.id);
}
