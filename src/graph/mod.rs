// Adaptive RAG Graph Module
// Explicit state machine over the retrieval components

pub mod builder;
pub mod node;
pub mod orchestrator;
pub mod runtime;
pub mod state;

pub mod nodes;

pub use builder::build_rag_graph;
pub use node::{GraphError, Node, NodeContext, NodeOutput, WorkflowComponents, WorkflowConfig};
pub use orchestrator::{AnswerResult, Orchestrator};
pub use runtime::GraphRuntime;
pub use state::{AgentState, Route, Stage, Termination};
