use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize document store: {0}")]
    Store(#[source] anyhow::Error),

    #[error("Failed to initialize LLM provider: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to build query graph: {0}")]
    Graph(#[source] anyhow::Error),
}
