// Retrieve Node
// Fetches candidate chunks for the current query

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{AgentState, Stage};

pub struct RetrieveNode;

impl RetrieveNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RetrieveNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RetrieveNode {
    fn stage(&self) -> Stage {
        Stage::Retrieve
    }

    fn name(&self) -> &'static str {
        "Retrieve Node"
    }

    async fn execute(
        &self,
        state: &mut AgentState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let hits = ctx
            .components
            .retriever
            .retrieve(&state.query, state.document_type_filter, ctx.config.top_k)
            .await
            .map_err(|e| GraphError::new(self.id(), e))?;

        tracing::debug!(
            "Iteration {}: {} chunks for query {:?}",
            state.iteration_count,
            hits.len(),
            state.query
        );
        state.retrieved_chunks = hits;
        Ok(NodeOutput::Continue(None))
    }
}
