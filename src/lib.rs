//! Adaptive retrieval-augmented question answering over energy-sector
//! documents.
//!
//! A query runs through an explicit state machine
//! (`retrieve → evaluate → {rewrite → retrieve} | answer`) with a relevance
//! gate and a hard iteration bound; see [`graph::Orchestrator`].

pub mod core;
pub mod graph;
pub mod llm;
pub mod rag;
pub mod state;
pub mod vector_math;

pub use crate::core::cancellation::CancellationToken;
pub use crate::core::errors::RagError;
pub use crate::graph::{AnswerResult, GraphError, Orchestrator, Termination};
pub use crate::state::AppState;
