use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::RagError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// check if the provider is healthy/reachable
    async fn health_check(&self) -> Result<bool, RagError>;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, RagError>;

    /// generate embeddings, one vector per input, in order
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, RagError>;
}
