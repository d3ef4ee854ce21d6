use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::{
    AppPaths, ConfigService, EmbeddingProviderKind, EvaluatorKind, GeneratorKind, RagSettings,
    RewriterKind, StoreBackend,
};
use crate::graph::{Orchestrator, WorkflowComponents, WorkflowConfig};
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::rag::{
    AnswerGenerator, ChunkingConfig, ContextBuilder, ContextBuilderConfig, DocumentStore, Embedder, ExtractiveGenerator, HashedEmbedder,
    InMemoryDocumentStore, IngestionPipeline, KeywordRewriter, LexicalEvaluator,
    LlmAnswerGenerator, LlmEmbedder, LlmEvaluator, LlmRewriter, QueryRewriter, RelevanceEvaluator,
    Retriever, SqliteDocumentStore,
};

pub mod error;

use error::InitializationError;

/// Application state shared by every query and ingestion task.
///
/// Contains references to:
/// - Configuration and paths
/// - The document store and embedder
/// - The query orchestrator and the ingestion pipeline built on them
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<RagSettings>,
    pub store: Arc<dyn DocumentStore>,
    pub embedder: Arc<dyn Embedder>,
    pub llm: Arc<dyn LlmProvider>,
    pub orchestrator: Arc<Orchestrator>,
    pub ingestion: Arc<IngestionPipeline>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Setting up paths and loading configuration
    /// 2. Opening the document store backend
    /// 3. Creating the LLM provider and the embedder
    /// 4. Assembling the workflow components and building the query graph
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        Self::from_settings(paths, config, settings).await
    }

    /// Same as `initialize`, with settings supplied by the caller.
    pub async fn from_settings(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: RagSettings,
    ) -> Result<Arc<Self>, InitializationError> {
        let store = build_store(&settings, &paths).await?;

        let llm: Arc<dyn LlmProvider> = Arc::new(
            OpenAiProvider::from_settings(&settings.llm)
                .map_err(|e| InitializationError::Llm(e.into()))?,
        );

        let embedder = build_embedder(&settings, llm.clone());

        let mut retriever = Retriever::new(store.clone(), embedder.clone());
        if settings.retrieval.min_score > 0.0 {
            retriever = retriever.with_min_score(settings.retrieval.min_score);
        }

        let components = WorkflowComponents {
            retriever: Arc::new(retriever),
            evaluator: build_evaluator(&settings, llm.clone()),
            rewriter: build_rewriter(&settings, llm.clone()),
            generator: build_generator(&settings, llm.clone()),
        };

        let orchestrator = Arc::new(
            Orchestrator::new(components, WorkflowConfig::from(&settings.workflow))
                .map_err(|e| InitializationError::Graph(e.into()))?,
        );

        let ingestion = Arc::new(IngestionPipeline::new(
            store.clone(),
            embedder.clone(),
            ChunkingConfig::from(&settings.ingestion),
        ));

        tracing::info!(
            "Initialized: store={:?}, embedder={:?}, evaluator={:?}, rewriter={:?}, generator={:?}",
            settings.store.backend,
            settings.embedding.provider,
            settings.workflow.evaluator,
            settings.workflow.rewriter,
            settings.workflow.generator
        );

        Ok(Arc::new(AppState {
            paths,
            config,
            settings: Arc::new(settings),
            store,
            embedder,
            llm,
            orchestrator,
            ingestion,
        }))
    }
}

async fn build_store(
    settings: &RagSettings,
    paths: &AppPaths,
) -> Result<Arc<dyn DocumentStore>, InitializationError> {
    match settings.store.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryDocumentStore::new())),
        StoreBackend::Sqlite => {
            let store = match &settings.store.sqlite_path {
                Some(path) => SqliteDocumentStore::with_path(PathBuf::from(path)).await,
                None => SqliteDocumentStore::new(paths).await,
            }
            .map_err(|e| InitializationError::Store(e.into()))?;
            Ok(Arc::new(store))
        }
    }
}

fn context_builder(settings: &RagSettings) -> ContextBuilder {
    ContextBuilder::new(ContextBuilderConfig {
        max_context_length: settings.llm.max_context_chars,
        ..ContextBuilderConfig::default()
    })
}

fn build_embedder(settings: &RagSettings, llm: Arc<dyn LlmProvider>) -> Arc<dyn Embedder> {
    match settings.embedding.provider {
        EmbeddingProviderKind::Hashed => {
            Arc::new(HashedEmbedder::new(settings.embedding.hashed_dimensions))
        }
        EmbeddingProviderKind::Llm => Arc::new(LlmEmbedder::new(
            llm,
            settings.llm.embedding_model.clone(),
            settings.llm.embedding_dimensions,
        )),
    }
}

fn build_evaluator(
    settings: &RagSettings,
    llm: Arc<dyn LlmProvider>,
) -> Arc<dyn RelevanceEvaluator> {
    match settings.workflow.evaluator {
        EvaluatorKind::Lexical => Arc::new(LexicalEvaluator::new()),
        EvaluatorKind::Llm => Arc::new(
            LlmEvaluator::new(llm, settings.llm.chat_model.clone())
                .with_context_builder(context_builder(settings)),
        ),
    }
}

fn build_rewriter(settings: &RagSettings, llm: Arc<dyn LlmProvider>) -> Arc<dyn QueryRewriter> {
    match settings.workflow.rewriter {
        RewriterKind::Keyword => Arc::new(KeywordRewriter::new()),
        RewriterKind::Llm => Arc::new(LlmRewriter::new(
            llm,
            settings.llm.chat_model.clone(),
            settings.llm.temperature,
        )),
    }
}

fn build_generator(settings: &RagSettings, llm: Arc<dyn LlmProvider>) -> Arc<dyn AnswerGenerator> {
    match settings.workflow.generator {
        GeneratorKind::Extractive => Arc::new(ExtractiveGenerator::default()),
        GeneratorKind::Llm => Arc::new(
            LlmAnswerGenerator::new(llm, settings.llm.chat_model.clone(), settings.llm.temperature)
                .with_context_builder(context_builder(settings)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::{Document, DocumentType};

    #[tokio::test]
    async fn default_settings_build_an_offline_stack() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::from_root(dir.path()));
        let config = ConfigService::new(paths.clone());

        let state = AppState::from_settings(paths, config, RagSettings::default())
            .await
            .unwrap();
        assert_eq!(state.embedder.dimensions(), 384);
        assert_eq!(state.orchestrator.config().max_iterations, 3);

        let document = Document::new("datasheet.pdf", DocumentType::Technical, 1);
        state
            .ingestion
            .ingest(document, &["Max power: 400W.".to_string()])
            .await
            .unwrap();

        let result = state
            .orchestrator
            .run("What is the maximum power output?", Some(DocumentType::Technical))
            .await
            .unwrap();
        assert!(result.answer.contains("400W"));
        assert_eq!(result.iterations_used, 0);
    }

    #[tokio::test]
    async fn sqlite_backend_uses_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::from_root(dir.path()));
        let config = ConfigService::new(paths.clone());
        let mut settings = RagSettings::default();
        settings.store.backend = StoreBackend::Sqlite;
        settings.store.sqlite_path = Some(dir.path().join("custom.db").display().to_string());

        let state = AppState::from_settings(paths, config, settings).await.unwrap();
        assert_eq!(state.store.count(None).await.unwrap(), 0);
        assert!(dir.path().join("custom.db").exists());
    }

    #[test]
    fn context_window_follows_llm_settings() {
        let mut settings = RagSettings::default();
        settings.llm.max_context_chars = 2_000;
        let builder = context_builder(&settings);
        assert_eq!(builder.config().max_context_length, 2_000);
        assert!(builder.config().include_metadata);
    }
}
