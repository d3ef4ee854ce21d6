//! Retrieval-augmented generation building blocks.
//!
//! This module provides:
//! - `DocumentStore` with in-memory and SQLite backends
//! - `Embedder` implementations (provider-backed and offline feature hashing)
//! - `Retriever`, `RelevanceEvaluator`, `QueryRewriter` and `AnswerGenerator`,
//!   the four components the query workflow in `graph` is assembled from
//! - `IngestionPipeline`, which chunks and indexes extracted document text

pub mod context_builder;
pub mod embedder;
pub mod evaluator;
pub mod generator;
pub mod ingest;
pub mod memory;
pub mod retriever;
pub mod rewriter;
pub mod sqlite;
pub mod store;
pub mod text;
pub mod types;

pub use context_builder::{ContextBuilder, ContextBuilderConfig, RenderedContext};
pub use embedder::{Embedder, HashedEmbedder, LlmEmbedder};
pub use evaluator::{LexicalEvaluator, LlmEvaluator, RelevanceEvaluator};
pub use generator::{AnswerGenerator, ExtractiveGenerator, GeneratedAnswer, LlmAnswerGenerator};
pub use ingest::{ChunkingConfig, IngestionPipeline, IngestionReport};
pub use memory::InMemoryDocumentStore;
pub use retriever::Retriever;
pub use rewriter::{KeywordRewriter, LlmRewriter, QueryRewriter};
pub use sqlite::SqliteDocumentStore;
pub use store::DocumentStore;
pub use types::{Chunk, ChunkReference, Document, DocumentStatus, DocumentType, ScoredChunk};
