// Graph State
// AgentState and the stage/route/termination enums of the query workflow

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rag::generator::GeneratedAnswer;
use crate::rag::types::{Chunk, DocumentType, ScoredChunk};

/// Workflow stages. Each stage is one node in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Retrieve,
    Evaluate,
    Rewrite,
    Answer,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Retrieve, Stage::Evaluate, Stage::Rewrite, Stage::Answer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Retrieve => "retrieve",
            Stage::Evaluate => "evaluate",
            Stage::Rewrite => "rewrite",
            Stage::Answer => "answer",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named conditional edges leaving a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// evaluate → answer (relevant, or iteration cap reached)
    Answer,
    /// evaluate → rewrite
    Rewrite,
    /// rewrite → answer when no distinct rewrite exists
    Exhausted,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Answer => "answer",
            Route::Rewrite => "rewrite",
            Route::Exhausted => "exhausted",
        }
    }
}

/// Why the retrieve/rewrite loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The relevance threshold was met.
    Relevant,
    /// `max_iterations` rewrites were spent without meeting the threshold.
    IterationCap,
    /// The rewriter could not produce a distinct query.
    RewriteExhausted,
}

impl Termination {
    /// Everything except a relevant first-class answer is low confidence.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Termination::Relevant)
    }
}

/// Per-query workflow state, owned by a single run.
#[derive(Debug, Clone)]
pub struct AgentState {
    // Input
    pub original_query: String,
    pub query: String,
    pub document_type_filter: Option<DocumentType>,

    // Current attempt
    pub retrieved_chunks: Vec<ScoredChunk>,
    pub relevance_score: f32,
    pub iteration_count: u32,

    // Best context seen across attempts
    pub best_chunks: Vec<ScoredChunk>,
    pub best_score: Option<f32>,

    // Outcome
    pub termination: Option<Termination>,
    pub answer: Option<GeneratedAnswer>,

    /// Stages executed so far, in order.
    pub visited: Vec<Stage>,
}

impl AgentState {
    pub fn new(query: impl Into<String>, document_type_filter: Option<DocumentType>) -> Self {
        let query = query.into();
        Self {
            original_query: query.clone(),
            query,
            document_type_filter,
            retrieved_chunks: Vec::new(),
            relevance_score: 0.0,
            iteration_count: 0,
            best_chunks: Vec::new(),
            best_score: None,
            termination: None,
            answer: None,
            visited: Vec::new(),
        }
    }

    /// Store the score of the current attempt and keep its chunks if they
    /// beat every earlier attempt (ties keep the earlier attempt).
    pub fn record_evaluation(&mut self, score: f32) {
        self.relevance_score = score;
        let improves = match self.best_score {
            None => true,
            Some(best) => score > best,
        };
        if improves {
            self.best_score = Some(score);
            self.best_chunks = self.retrieved_chunks.clone();
        }
    }

    /// Context handed to the generator: the current attempt when it met the
    /// threshold, otherwise the best attempt seen.
    pub fn answer_context(&self) -> &[ScoredChunk] {
        match self.termination {
            Some(Termination::Relevant) | None => &self.retrieved_chunks,
            Some(_) => &self.best_chunks,
        }
    }

    /// Score of the context returned by `answer_context`.
    pub fn answer_confidence(&self) -> f32 {
        match self.termination {
            Some(Termination::Relevant) | None => self.relevance_score,
            Some(_) => self.best_score.unwrap_or(0.0),
        }
    }

    pub fn answer_chunks(&self) -> Vec<Chunk> {
        self.answer_context()
            .iter()
            .map(|hit| hit.chunk.clone())
            .collect()
    }

    pub fn trace(&self) -> Vec<String> {
        self.visited.iter().map(|s| s.as_str().to_string()).collect()
    }
}
