//! Relevance evaluation: how well does a chunk set answer a query?

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use super::context_builder::ContextBuilder;
use super::text;
use super::types::Chunk;
use crate::core::errors::RagError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

/// Scores a chunk set against a query.
///
/// Implementations return a value in `[0, 1]`, are deterministic for
/// identical inputs and have no side effects. An empty chunk set scores 0.0
/// without any external call.
#[async_trait]
pub trait RelevanceEvaluator: Send + Sync {
    async fn evaluate(&self, query: &str, chunks: &[Chunk]) -> Result<f32, RagError>;
}

/// Term-coverage heuristic.
///
/// The score is the mean of two coverages of the query's concept terms:
/// by the union of all chunks, and by the single best chunk. The second term
/// rewards context where one passage actually answers the question rather
/// than scattering keywords across many.
#[derive(Debug, Clone, Default)]
pub struct LexicalEvaluator;

impl LexicalEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn score(query: &str, chunks: &[Chunk]) -> f32 {
        if chunks.is_empty() {
            return 0.0;
        }
        let query_terms = text::concept_terms(query);
        if query_terms.is_empty() {
            return 0.0;
        }

        let mut union = BTreeSet::new();
        let mut best = 0.0_f32;
        for chunk in chunks {
            let terms = text::concept_terms(&chunk.text);
            best = best.max(text::coverage(&query_terms, &terms));
            union.extend(terms);
        }
        let overall = text::coverage(&query_terms, &union);

        ((overall + best) / 2.0).clamp(0.0, 1.0)
    }
}

#[async_trait]
impl RelevanceEvaluator for LexicalEvaluator {
    async fn evaluate(&self, query: &str, chunks: &[Chunk]) -> Result<f32, RagError> {
        Ok(Self::score(query, chunks))
    }
}

const GRADER_PROMPT: &str = "You grade retrieved context for a question-answering system over \
energy-sector documents. Reply with a single number between 0 and 1: 1 means the context fully \
answers the question, 0 means it is unrelated. Reply with the number only.";

/// Asks the chat model to grade the context at temperature 0.
///
/// The grader sees only the leading chunks that fit the context builder's
/// window (`llm.max_context_chars`); chunks past it do not affect the score.
pub struct LlmEvaluator {
    provider: Arc<dyn LlmProvider>,
    model_id: String,
    context_builder: ContextBuilder,
}

impl LlmEvaluator {
    pub fn new(provider: Arc<dyn LlmProvider>, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            context_builder: ContextBuilder::default(),
        }
    }

    pub fn with_context_builder(mut self, context_builder: ContextBuilder) -> Self {
        self.context_builder = context_builder;
        self
    }
}

#[async_trait]
impl RelevanceEvaluator for LlmEvaluator {
    async fn evaluate(&self, query: &str, chunks: &[Chunk]) -> Result<f32, RagError> {
        if chunks.is_empty() {
            return Ok(0.0);
        }

        let context = self.context_builder.render(chunks);
        if context.included < chunks.len() {
            tracing::debug!(
                "Grading {} of {} chunks; the rest exceed the context window",
                context.included,
                chunks.len()
            );
        }
        let request = ChatRequest::new(vec![
            ChatMessage::system(GRADER_PROMPT),
            ChatMessage::user(format!(
                "Question: {}\n\nContext:\n{}\n\nScore:",
                query, context.text
            )),
        ])
        .with_temperature(0.0)
        .with_max_tokens(8);

        let reply = self
            .provider
            .chat(request, &self.model_id)
            .await
            .map_err(|e| RagError::Evaluation(e.to_string()))?;

        parse_score(&reply)
            .ok_or_else(|| RagError::Evaluation(format!("unparseable relevance score: {:?}", reply)))
    }
}

static SCORE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").ok());

/// First number in `reply`, clamped to `[0, 1]`.
fn parse_score(reply: &str) -> Option<f32> {
    let raw = SCORE_PATTERN.as_ref()?.find(reply)?.as_str().parse::<f32>().ok()?;
    if raw.is_nan() {
        return None;
    }
    Some(raw.clamp(0.0, 1.0))
}
