// Graph Runtime - petgraph based
// Type-safe StateGraph execution engine

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::node::{GraphError, Node, NodeContext, NodeOutput};
use super::state::{AgentState, Route, Stage};
use crate::core::errors::RagError;

/// Edge condition for graph routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeCondition {
    /// Always follow this edge (default edge)
    Always,
    /// Follow this edge when the node branches on this route
    On(Route),
}

impl EdgeCondition {
    pub fn matches(&self, route: Option<Route>) -> bool {
        match (self, route) {
            (EdgeCondition::Always, None) => true,
            (EdgeCondition::On(expected), Some(actual)) => *expected == actual,
            _ => false,
        }
    }
}

/// petgraph-based StateGraph runtime
pub struct GraphRuntime {
    /// The underlying directed graph
    graph: DiGraph<Box<dyn Node>, EdgeCondition>,
    /// Map from stage to NodeIndex for lookup
    node_indices: HashMap<Stage, NodeIndex>,
    /// Entry point
    entry: Option<Stage>,
    /// Maximum execution steps
    max_steps: usize,
}

impl GraphRuntime {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            entry: None,
            max_steps: 50,
        }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Box<dyn Node>) -> NodeIndex {
        let stage = node.stage();
        let index = self.graph.add_node(node);
        self.node_indices.insert(stage, index);
        index
    }

    /// Add an edge between two nodes (always follow)
    pub fn add_edge(&mut self, from: Stage, to: Stage) -> Result<(), GraphError> {
        self.add_conditional_edge(from, to, EdgeCondition::Always)
    }

    /// Add a conditional edge between two nodes
    pub fn add_conditional_edge(
        &mut self,
        from: Stage,
        to: Stage,
        condition: EdgeCondition,
    ) -> Result<(), GraphError> {
        let from_idx = self.index_of(from, "Source")?;
        let to_idx = self.index_of(to, "Target")?;
        self.graph.add_edge(from_idx, to_idx, condition);
        Ok(())
    }

    fn index_of(&self, stage: Stage, role: &str) -> Result<NodeIndex, GraphError> {
        self.node_indices.get(&stage).copied().ok_or_else(|| {
            GraphError::new(
                stage.as_str(),
                RagError::Internal(format!("{} node not found: {}", role, stage)),
            )
        })
    }

    /// Get node by stage
    pub fn get_node(&self, stage: Stage) -> Option<&dyn Node> {
        self.node_indices
            .get(&stage)
            .and_then(|idx| self.graph.node_weight(*idx))
            .map(|boxed| boxed.as_ref())
    }

    /// Check for cycles in the graph (the rewrite loop is one)
    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Execute the graph.
    ///
    /// Cancellation is checked before every step; each executed stage is
    /// appended to `state.visited`. Errors carry the trace of stages executed
    /// up to and including the failing one.
    pub async fn run(
        &self,
        state: &mut AgentState,
        ctx: &NodeContext<'_>,
    ) -> Result<(), GraphError> {
        let entry = self
            .entry
            .ok_or_else(|| GraphError::new("runtime", RagError::internal("No entry node set")))?;
        let mut current_idx = self.index_of(entry, "Entry")?;
        let mut step = 0;

        loop {
            let node = self.graph.node_weight(current_idx).ok_or_else(|| {
                GraphError::new("runtime", RagError::internal("Node not found in graph"))
            })?;
            let node_id = node.id();

            if ctx.cancel.is_cancelled() {
                tracing::info!("Run cancelled before {} (step {})", node_id, step);
                return Err(GraphError::new(node_id, RagError::Cancelled).with_trace(state.trace()));
            }

            if step >= self.max_steps {
                return Err(GraphError::new(
                    "runtime",
                    RagError::Internal(format!("Maximum steps ({}) exceeded", self.max_steps)),
                )
                .with_trace(state.trace()));
            }

            tracing::debug!("Executing node: {} (step {})", node_id, step);
            state.visited.push(node.stage());

            let output = match node.execute(state, ctx).await {
                Ok(output) => output,
                Err(err) => return Err(err.with_trace(state.trace())),
            };

            match output {
                NodeOutput::Final => {
                    tracing::debug!("Graph execution complete at node: {}", node_id);
                    return Ok(());
                }
                NodeOutput::Continue(explicit_next) => {
                    current_idx = self
                        .resolve_next_node(current_idx, None, explicit_next)
                        .map_err(|e| e.with_trace(state.trace()))?;
                }
                NodeOutput::Branch(route) => {
                    current_idx = self
                        .resolve_next_node(current_idx, Some(route), None)
                        .map_err(|e| e.with_trace(state.trace()))?;
                }
            }

            step += 1;
        }
    }

    /// Resolve the next node based on edges
    fn resolve_next_node(
        &self,
        current_idx: NodeIndex,
        route: Option<Route>,
        explicit: Option<Stage>,
    ) -> Result<NodeIndex, GraphError> {
        let current_id = self
            .graph
            .node_weight(current_idx)
            .map(|n| n.id())
            .unwrap_or("unknown");

        if let Some(next) = explicit {
            return self.index_of(next, "Explicit target");
        }

        let edges: Vec<(NodeIndex, EdgeCondition)> = self
            .graph
            .edges_directed(current_idx, Direction::Outgoing)
            .map(|edge_ref| (edge_ref.target(), *edge_ref.weight()))
            .collect();

        if edges.is_empty() {
            return Err(GraphError::new(
                current_id,
                RagError::Internal(format!("No outgoing edges from node: {}", current_id)),
            ));
        }

        edges
            .iter()
            .find(|(_, condition)| condition.matches(route))
            .map(|(target, _)| *target)
            .ok_or_else(|| {
                GraphError::new(
                    current_id,
                    RagError::Internal(format!(
                        "No matching edge for route: {}",
                        route.map(|r| r.as_str()).unwrap_or("(none)")
                    )),
                )
            })
    }
}

impl Default for GraphRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing graphs fluently
pub struct GraphBuilder {
    runtime: GraphRuntime,
    pending_edges: Vec<(Stage, Stage, EdgeCondition)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            runtime: GraphRuntime::new(),
            pending_edges: Vec::new(),
        }
    }

    pub fn entry(mut self, stage: Stage) -> Self {
        self.runtime.entry = Some(stage);
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.runtime.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.runtime.add_node(node);
        self
    }

    pub fn edge(mut self, from: Stage, to: Stage) -> Self {
        self.pending_edges.push((from, to, EdgeCondition::Always));
        self
    }

    pub fn conditional_edge(mut self, from: Stage, to: Stage, route: Route) -> Self {
        self.pending_edges.push((from, to, EdgeCondition::On(route)));
        self
    }

    pub fn build(mut self) -> Result<GraphRuntime, GraphError> {
        for (from, to, condition) in self.pending_edges {
            self.runtime.add_conditional_edge(from, to, condition)?;
        }
        Ok(self.runtime)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
