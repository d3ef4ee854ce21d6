// Answer Node
// Generates the final answer from the selected context

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{AgentState, Stage};

pub struct AnswerNode;

impl AnswerNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AnswerNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for AnswerNode {
    fn stage(&self) -> Stage {
        Stage::Answer
    }

    fn name(&self) -> &'static str {
        "Answer Node"
    }

    async fn execute(
        &self,
        state: &mut AgentState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let chunks = state.answer_chunks();
        let generated = ctx
            .components
            .generator
            .generate(&state.original_query, &chunks)
            .await
            .map_err(|e| GraphError::new(self.id(), e))?;

        state.answer = Some(generated);
        Ok(NodeOutput::Final)
    }
}
