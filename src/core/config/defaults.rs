// Built-in configuration defaults.
// The threshold and iteration cap are tuning knobs carried over from the
// prototype; nothing guarantees they are optimal.

use serde_json::{json, Value};

pub const RELEVANCE_THRESHOLD: f32 = 0.75;
pub const MAX_ITERATIONS: u32 = 3;
pub const TOP_K: usize = 5;
pub const MIN_SCORE: f32 = 0.0;

pub const CHUNK_SIZE: usize = 1000;
pub const CHUNK_OVERLAP: usize = 200;
pub const EMBED_BATCH_SIZE: usize = 32;

pub const LLM_BASE_URL: &str = "https://api.openai.com";
pub const CHAT_MODEL: &str = "gpt-4o";
pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const EMBEDDING_DIMENSIONS: usize = 1536;
pub const LLM_TIMEOUT_SECS: u64 = 60;
pub const MAX_CONTEXT_CHARS: usize = 12_000;

pub const HASHED_DIMENSIONS: usize = 384;

/// The full default configuration tree, in the same shape as `config.yml`.
pub fn default_config() -> Value {
    json!({
        "workflow": {
            "relevance_threshold": RELEVANCE_THRESHOLD,
            "max_iterations": MAX_ITERATIONS,
            "top_k": TOP_K,
            "evaluator": "lexical",
            "rewriter": "keyword",
            "generator": "extractive"
        },
        "retrieval": {
            "min_score": MIN_SCORE
        },
        "ingestion": {
            "chunk_size": CHUNK_SIZE,
            "chunk_overlap": CHUNK_OVERLAP,
            "embed_batch_size": EMBED_BATCH_SIZE
        },
        "store": {
            "backend": "memory"
        },
        "llm": {
            "base_url": LLM_BASE_URL,
            "chat_model": CHAT_MODEL,
            "embedding_model": EMBEDDING_MODEL,
            "embedding_dimensions": EMBEDDING_DIMENSIONS,
            "temperature": 0.0,
            "timeout_secs": LLM_TIMEOUT_SECS,
            "max_context_chars": MAX_CONTEXT_CHARS
        },
        "embedding": {
            "provider": "hashed",
            "hashed_dimensions": HASHED_DIMENSIONS
        }
    })
}
