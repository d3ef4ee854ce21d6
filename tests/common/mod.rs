//! Scripted components shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use adaptive_rag::core::cancellation::CancellationToken;
use adaptive_rag::graph::{Orchestrator, WorkflowComponents, WorkflowConfig};
use adaptive_rag::rag::{
    AnswerGenerator, Chunk, DocumentStore, DocumentType, ExtractiveGenerator, GeneratedAnswer,
    HashedEmbedder, InMemoryDocumentStore, KeywordRewriter, LexicalEvaluator, QueryRewriter,
    RelevanceEvaluator, Retriever,
};
use adaptive_rag::RagError;

pub const DIMENSIONS: usize = 256;

/// In-memory store seeded with `(text, type)` pairs, all under one document.
pub async fn seeded_store(
    embedder: &HashedEmbedder,
    texts: &[(&str, DocumentType)],
) -> Arc<InMemoryDocumentStore> {
    let store = Arc::new(InMemoryDocumentStore::new());
    let document_id = Uuid::new_v4();
    for (i, (text, doc_type)) in texts.iter().enumerate() {
        let chunk = Chunk::new(*text, embedder.embed_text(text), document_id, *doc_type, i as u32);
        store.upsert(chunk).await.unwrap();
    }
    store
}

pub struct Builder {
    pub store: Arc<dyn DocumentStore>,
    pub evaluator: Arc<dyn RelevanceEvaluator>,
    pub rewriter: Arc<dyn QueryRewriter>,
    pub generator: Arc<dyn AnswerGenerator>,
    pub config: WorkflowConfig,
}

impl Builder {
    pub async fn with_texts(texts: &[(&str, DocumentType)]) -> Self {
        let embedder = HashedEmbedder::new(DIMENSIONS);
        Self {
            store: seeded_store(&embedder, texts).await,
            evaluator: Arc::new(LexicalEvaluator::new()),
            rewriter: Arc::new(KeywordRewriter::new()),
            generator: Arc::new(ExtractiveGenerator::default()),
            config: WorkflowConfig::default(),
        }
    }

    pub fn evaluator(mut self, evaluator: impl RelevanceEvaluator + 'static) -> Self {
        self.evaluator = Arc::new(evaluator);
        self
    }

    pub fn rewriter(mut self, rewriter: impl QueryRewriter + 'static) -> Self {
        self.rewriter = Arc::new(rewriter);
        self
    }

    pub fn generator(mut self, generator: impl AnswerGenerator + 'static) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn build(self) -> Orchestrator {
        let components = WorkflowComponents {
            retriever: Arc::new(Retriever::new(
                self.store,
                Arc::new(HashedEmbedder::new(DIMENSIONS)),
            )),
            evaluator: self.evaluator,
            rewriter: self.rewriter,
            generator: self.generator,
        };
        Orchestrator::new(components, self.config).unwrap()
    }
}

/// Returns scripted scores in order, repeating the last one. Optionally
/// fires a cancellation token after a given number of calls.
pub struct ScriptedEvaluator {
    scores: Mutex<VecDeque<f32>>,
    last: Mutex<f32>,
    calls: Arc<Mutex<usize>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedEvaluator {
    pub fn new(scores: &[f32]) -> Self {
        Self {
            scores: Mutex::new(scores.iter().copied().collect()),
            last: Mutex::new(0.0),
            calls: Arc::new(Mutex::new(0)),
            cancel_after: None,
        }
    }

    pub fn cancel_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub fn calls(&self) -> Arc<Mutex<usize>> {
        self.calls.clone()
    }
}

#[async_trait]
impl RelevanceEvaluator for ScriptedEvaluator {
    async fn evaluate(&self, _query: &str, _chunks: &[Chunk]) -> Result<f32, RagError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if let Some((after, token)) = &self.cancel_after {
            if *calls >= *after {
                token.cancel();
            }
        }

        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.scores.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(*last)
    }
}

/// Appends a counter to the query so every rewrite is distinct.
#[derive(Default)]
pub struct CountingRewriter {
    pub calls: Arc<Mutex<usize>>,
}

#[async_trait]
impl QueryRewriter for CountingRewriter {
    async fn rewrite(
        &self,
        _original_query: &str,
        current_query: &str,
        _chunks: &[Chunk],
    ) -> Result<String, RagError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        Ok(format!("{} r{}", current_query, *calls))
    }
}

pub struct ExhaustedRewriter;

#[async_trait]
impl QueryRewriter for ExhaustedRewriter {
    async fn rewrite(
        &self,
        _original_query: &str,
        current_query: &str,
        _chunks: &[Chunk],
    ) -> Result<String, RagError> {
        Err(RagError::RewriteExhausted(current_query.to_string()))
    }
}

pub struct FailingGenerator {
    pub calls: Arc<Mutex<usize>>,
}

impl FailingGenerator {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(0)),
        }
    }
}

#[async_trait]
impl AnswerGenerator for FailingGenerator {
    async fn generate(&self, _query: &str, _chunks: &[Chunk]) -> Result<GeneratedAnswer, RagError> {
        *self.calls.lock().unwrap() += 1;
        Err(RagError::Generation("upstream returned 503".to_string()))
    }
}
