// Graph Builder
// Constructs the adaptive retrieval graph using petgraph

use super::node::{GraphError, WorkflowConfig};
use super::nodes::{AnswerNode, EvaluateNode, RetrieveNode, RewriteNode};
use super::runtime::{GraphBuilder, GraphRuntime};
use super::state::{Route, Stage};

/// Build the retrieve → evaluate → {rewrite → retrieve} | answer graph
pub fn build_rag_graph(config: &WorkflowConfig) -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry(Stage::Retrieve)
        .max_steps(config.step_limit())
        .node(Box::new(RetrieveNode::new()))
        .node(Box::new(EvaluateNode::new()))
        .node(Box::new(RewriteNode::new()))
        .node(Box::new(AnswerNode::new()))
        .edge(Stage::Retrieve, Stage::Evaluate)
        // Evaluate edges (threshold met or iterations spent vs. try again)
        .conditional_edge(Stage::Evaluate, Stage::Answer, Route::Answer)
        .conditional_edge(Stage::Evaluate, Stage::Rewrite, Route::Rewrite)
        // Rewrite -> Retrieve (default edge), or straight to Answer when exhausted
        .edge(Stage::Rewrite, Stage::Retrieve)
        .conditional_edge(Stage::Rewrite, Stage::Answer, Route::Exhausted)
        .build()
}
