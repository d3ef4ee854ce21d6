// Node trait and types
// Base abstraction for workflow nodes

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::cancellation::CancellationToken;
use crate::core::config::settings::WorkflowSettings;
use crate::core::errors::RagError;
use crate::rag::evaluator::RelevanceEvaluator;
use crate::rag::generator::AnswerGenerator;
use crate::rag::retriever::Retriever;
use crate::rag::rewriter::QueryRewriter;

use super::state::{AgentState, Route, Stage};

/// Tunables of the retrieve/evaluate/rewrite loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkflowConfig {
    pub relevance_threshold: f32,
    pub max_iterations: u32,
    pub top_k: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self::from(&WorkflowSettings::default())
    }
}

impl From<&WorkflowSettings> for WorkflowConfig {
    fn from(settings: &WorkflowSettings) -> Self {
        Self {
            relevance_threshold: settings.relevance_threshold,
            max_iterations: settings.max_iterations,
            top_k: settings.top_k,
        }
    }
}

impl WorkflowConfig {
    /// Runtime step limit. One pass is retrieve + evaluate + rewrite, there
    /// are at most `max_iterations + 1` passes, plus the final answer step.
    pub fn step_limit(&self) -> usize {
        3 * (self.max_iterations as usize + 1) + 2
    }

    pub fn validate(&self) -> Result<(), RagError> {
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(RagError::Config(format!(
                "relevance_threshold must be within [0, 1], got {}",
                self.relevance_threshold
            )));
        }
        Ok(())
    }
}

/// The four pluggable components the workflow is assembled from.
#[derive(Clone)]
pub struct WorkflowComponents {
    pub retriever: Arc<Retriever>,
    pub evaluator: Arc<dyn RelevanceEvaluator>,
    pub rewriter: Arc<dyn QueryRewriter>,
    pub generator: Arc<dyn AnswerGenerator>,
}

/// Context passed to nodes during execution
pub struct NodeContext<'a> {
    pub components: &'a WorkflowComponents,
    pub config: &'a WorkflowConfig,
    /// Checked by the runtime before every step
    pub cancel: &'a CancellationToken,
}

/// Output from a node execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutput {
    /// Continue to the specified next stage (None = use default edge)
    Continue(Option<Stage>),
    /// Follow the conditional edge for this route
    Branch(Route),
    /// Graph execution complete
    Final,
}

/// Graph execution error
///
/// Wraps the typed error that stopped the run together with the stage that
/// raised it and the ordered list of stages executed before it.
#[derive(Debug, Clone)]
pub struct GraphError {
    pub node_id: String,
    pub source: RagError,
    /// Ordered list of node IDs executed before this error, most-recent last.
    pub execution_trace: Vec<String>,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, source: RagError) -> Self {
        Self {
            node_id: node_id.into(),
            source,
            execution_trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.execution_trace = trace;
        self
    }

    pub fn error(&self) -> &RagError {
        &self.source
    }

    pub fn into_inner(self) -> RagError {
        self.source
    }
}

impl From<GraphError> for RagError {
    fn from(err: GraphError) -> Self {
        err.into_inner()
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "GraphError in {}: {}", self.node_id, self.source)
        } else {
            write!(
                f,
                "GraphError in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.source
            )
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Node trait - all graph nodes implement this
#[async_trait]
pub trait Node: Send + Sync {
    /// The stage this node implements
    fn stage(&self) -> Stage;

    /// Unique identifier for this node
    fn id(&self) -> &'static str {
        self.stage().as_str()
    }

    /// Human-readable name for display
    fn name(&self) -> &'static str {
        self.id()
    }

    /// Execute the node logic
    async fn execute(
        &self,
        state: &mut AgentState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError>;
}
