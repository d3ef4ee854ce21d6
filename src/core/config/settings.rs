//! Typed view over the merged configuration tree.
//!
//! Every section carries `#[serde(default)]`, so a partial `config.yml` only
//! needs to name the values it changes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::defaults;
use crate::core::errors::RagError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub workflow: WorkflowSettings,
    pub retrieval: RetrievalSettings,
    pub ingestion: IngestionSettings,
    pub store: StoreSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
}

impl RagSettings {
    pub fn from_value(value: &Value) -> Result<Self, RagError> {
        serde_json::from_value(value.clone()).map_err(|e| RagError::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluatorKind {
    #[default]
    Lexical,
    Llm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewriterKind {
    #[default]
    Keyword,
    Llm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    #[default]
    Extractive,
    Llm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    pub relevance_threshold: f32,
    pub max_iterations: u32,
    pub top_k: usize,
    pub evaluator: EvaluatorKind,
    pub rewriter: RewriterKind,
    pub generator: GeneratorKind,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            relevance_threshold: defaults::RELEVANCE_THRESHOLD,
            max_iterations: defaults::MAX_ITERATIONS,
            top_k: defaults::TOP_K,
            evaluator: EvaluatorKind::default(),
            rewriter: RewriterKind::default(),
            generator: GeneratorKind::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub min_score: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            min_score: defaults::MIN_SCORE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embed_batch_size: usize,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            chunk_size: defaults::CHUNK_SIZE,
            chunk_overlap: defaults::CHUNK_OVERLAP,
            embed_batch_size: defaults::EMBED_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Overrides `AppPaths::db_path` for the SQLite backend.
    pub sqlite_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub temperature: f64,
    pub timeout_secs: u64,
    /// Context window, in characters, for the LLM grader and generator.
    pub max_context_chars: usize,
    pub api_key: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: defaults::LLM_BASE_URL.to_string(),
            chat_model: defaults::CHAT_MODEL.to_string(),
            embedding_model: defaults::EMBEDDING_MODEL.to_string(),
            embedding_dimensions: defaults::EMBEDDING_DIMENSIONS,
            temperature: 0.0,
            timeout_secs: defaults::LLM_TIMEOUT_SECS,
            max_context_chars: defaults::MAX_CONTEXT_CHARS,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    Llm,
    #[default]
    Hashed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub hashed_dimensions: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            hashed_dimensions: defaults::HASHED_DIMENSIONS,
        }
    }
}
