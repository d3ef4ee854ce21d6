use thiserror::Error;

/// Error taxonomy shared by every stage of the query workflow.
///
/// Only `RewriteExhausted` is recovered locally (by the orchestrator); every
/// other variant aborts a run and reaches the caller unchanged.
#[derive(Debug, Clone, Error)]
pub enum RagError {
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    #[error("relevance evaluation failed: {0}")]
    Evaluation(String),
    #[error("no productive rewrite available for query: {0}")]
    RewriteExhausted(String),
    #[error("answer generation failed: {0}")]
    Generation(String),
    #[error("document store error: {0}")]
    Store(String),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("llm provider error: {0}")]
    Llm(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("query cancelled")]
    Cancelled,
    #[error("internal error: {0}")]
    Internal(String),
}

impl RagError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        RagError::Internal(err.to_string())
    }

    pub fn store<E: std::fmt::Display>(err: E) -> Self {
        RagError::Store(err.to_string())
    }

    /// Short machine-readable name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RagError::Retrieval(_) => "retrieval",
            RagError::Evaluation(_) => "evaluation",
            RagError::RewriteExhausted(_) => "rewrite_exhausted",
            RagError::Generation(_) => "generation",
            RagError::Store(_) => "store",
            RagError::Embedding(_) => "embedding",
            RagError::Llm(_) => "llm",
            RagError::Config(_) => "config",
            RagError::InvalidInput(_) => "invalid_input",
            RagError::Cancelled => "cancelled",
            RagError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for RagError {
    fn from(err: sqlx::Error) -> Self {
        RagError::Store(err.to_string())
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RagError::Llm(format!("request timed out: {}", err))
        } else {
            RagError::Llm(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_variant_context() {
        let err = RagError::Generation("upstream 500".to_string());
        assert_eq!(err.to_string(), "answer generation failed: upstream 500");
        assert_eq!(RagError::Cancelled.to_string(), "query cancelled");
    }

    #[test]
    fn kind_is_stable_per_variant() {
        assert_eq!(RagError::Retrieval(String::new()).kind(), "retrieval");
        assert_eq!(
            RagError::RewriteExhausted(String::new()).kind(),
            "rewrite_exhausted"
        );
        assert_eq!(RagError::internal("boom").kind(), "internal");
    }
}
