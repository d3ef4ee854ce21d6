// Orchestrator
// Runs one query through the retrieval graph and packages the result

use serde::{Deserialize, Serialize};

use super::builder::build_rag_graph;
use super::node::{GraphError, NodeContext, WorkflowComponents, WorkflowConfig};
use super::runtime::GraphRuntime;
use super::state::{AgentState, Termination};
use crate::core::cancellation::CancellationToken;
use crate::core::errors::RagError;
use crate::rag::types::{Chunk, ChunkReference, DocumentType};

/// Final output of a query run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    /// Chunks selected as answer context (embeddings stripped). LLM-backed
    /// generators only see the leading ones that fit `llm.max_context_chars`;
    /// `citations` never point past those.
    pub sources: Vec<Chunk>,
    pub citations: Vec<ChunkReference>,
    /// Relevance score of `sources`.
    pub confidence: f32,
    pub iterations_used: u32,
    /// Set when the threshold was never met.
    pub low_confidence: bool,
    pub termination: Termination,
    /// Query used for the last retrieval.
    pub final_query: String,
}

impl AnswerResult {
    fn from_state(state: AgentState) -> Result<Self, RagError> {
        let termination = state.termination.ok_or_else(|| {
            RagError::internal("graph finished without recording a termination reason")
        })?;
        let sources = state
            .answer_chunks()
            .into_iter()
            .map(|mut chunk| {
                chunk.embedding = Vec::new();
                chunk
            })
            .collect();
        let confidence = state.answer_confidence();
        let generated = state
            .answer
            .ok_or_else(|| RagError::internal("graph finished without an answer"))?;

        Ok(Self {
            answer: generated.answer,
            sources,
            citations: generated.citations,
            confidence,
            iterations_used: state.iteration_count,
            low_confidence: termination.is_degraded(),
            termination,
            final_query: state.query,
        })
    }
}

/// Entry point for front ends: owns the graph, the components and the loop
/// tunables. One instance serves any number of concurrent queries.
pub struct Orchestrator {
    runtime: GraphRuntime,
    components: WorkflowComponents,
    config: WorkflowConfig,
}

impl Orchestrator {
    pub fn new(components: WorkflowComponents, config: WorkflowConfig) -> Result<Self, GraphError> {
        config
            .validate()
            .map_err(|e| GraphError::new("orchestrator", e))?;
        let runtime = build_rag_graph(&config)?;
        Ok(Self {
            runtime,
            components,
            config,
        })
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn components(&self) -> &WorkflowComponents {
        &self.components
    }

    /// Answer `query`, optionally restricted to one document type.
    pub async fn run(
        &self,
        query: &str,
        filter: Option<DocumentType>,
    ) -> Result<AnswerResult, GraphError> {
        self.run_with_cancel(query, filter, &CancellationToken::new())
            .await
    }

    /// Like `run`, but stops with `RagError::Cancelled` at the next stage
    /// boundary once `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        query: &str,
        filter: Option<DocumentType>,
        cancel: &CancellationToken,
    ) -> Result<AnswerResult, GraphError> {
        tracing::info!(
            "Query started: {:?} (filter={:?})",
            query,
            filter.map(|f| f.as_str())
        );

        let ctx = NodeContext {
            components: &self.components,
            config: &self.config,
            cancel,
        };
        let mut state = AgentState::new(query, filter);

        if let Err(err) = self.runtime.run(&mut state, &ctx).await {
            tracing::error!("Query failed [{}]: {}", err.error().kind(), err);
            return Err(err);
        }

        let trace = state.trace();
        let result = AnswerResult::from_state(state)
            .map_err(|e| GraphError::new("orchestrator", e).with_trace(trace))?;

        tracing::info!(
            "Query finished: termination={:?}, iterations={}, confidence={:.3}, sources={}",
            result.termination,
            result.iterations_used,
            result.confidence,
            result.sources.len()
        );
        Ok(result)
    }
}
