// Evaluate Node
// Scores the retrieved context and picks the next stage

use async_trait::async_trait;

use crate::core::errors::RagError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{AgentState, Route, Stage, Termination};
use crate::rag::types::Chunk;

pub struct EvaluateNode;

impl EvaluateNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EvaluateNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for EvaluateNode {
    fn stage(&self) -> Stage {
        Stage::Evaluate
    }

    fn name(&self) -> &'static str {
        "Evaluate Node"
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

        // Relevance is judged against the user's question, not the rewrite.
        let score = ctx
            .components
            .evaluator
            .evaluate(&state.original_query, &chunks)
            .await
            .map_err(|e| GraphError::new(self.id(), e))?;

        if !(0.0..=1.0).contains(&score) {
            return Err(GraphError::new(
                self.id(),
                RagError::Evaluation(format!("score {} outside [0, 1]", score)),
            ));
        }

        state.record_evaluation(score);

        if score >= ctx.config.relevance_threshold {
            tracing::debug!("Relevance {:.3} meets threshold", score);
            state.termination = Some(Termination::Relevant);
            return Ok(NodeOutput::Branch(Route::Answer));
        }

        if state.iteration_count >= ctx.config.max_iterations {
            tracing::warn!(
                "Relevance {:.3} below {:.2} after {} rewrites; answering from best context",
                score,
                ctx.config.relevance_threshold,
                state.iteration_count
            );
            state.termination = Some(Termination::IterationCap);
            return Ok(NodeOutput::Branch(Route::Answer));
        }

        Ok(NodeOutput::Branch(Route::Rewrite))
    }
}
