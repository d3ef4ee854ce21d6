// Rewrite Node
// Reformulates the query and loops back to retrieval

use async_trait::async_trait;

use crate::core::errors::RagError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{AgentState, Route, Stage, Termination};
use crate::rag::types::Chunk;

pub struct RewriteNode;

impl RewriteNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RewriteNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RewriteNode {
    fn stage(&self) -> Stage {
        Stage::Rewrite
    }

    fn name(&self) -> &'static str {
        "Rewrite Node"
    }

    async fn execute(
        &self,
        state: &mut AgentState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let chunks: Vec<Chunk> = state
            .retrieved_chunks
            .iter()
            .map(|hit| hit.chunk.clone())
            .collect();

        let result = ctx
            .components
            .rewriter
            .rewrite(&state.original_query, &state.query, &chunks)
            .await;

        match result {
            Ok(rewritten) => {
                tracing::debug!("Rewrote {:?} -> {:?}", state.query, rewritten);
                state.query = rewritten;
                state.iteration_count += 1;
                Ok(NodeOutput::Continue(None))
            }
            Err(RagError::RewriteExhausted(query)) => {
                tracing::warn!(
                    "No distinct rewrite for {:?}; answering from best context",
                    query
                );
                state.iteration_count = state.iteration_count.max(ctx.config.max_iterations);
                state.termination = Some(Termination::RewriteExhausted);
                Ok(NodeOutput::Branch(Route::Exhausted))
            }
            Err(e) => Err(GraphError::new(self.id(), e)),
        }
    }
}
