// Graph Runtime - petgraph based
// Edge table is validated once at build time; runs never fall back silently

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef, Reversed};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

use super::node::{GraphError, Node, NodeContext, NodeOutput};
use super::state::GraphState;

/// Terminal sentinel. Reaching it ends the run.
pub const END: &str = "__end__";

/// Edge condition for graph routing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeCondition {
    /// Followed when the node returns `Continue`
    Always,
    /// Followed when the node branches on this condition
    OnCondition(String),
}

impl EdgeCondition {
    pub fn on(condition: impl Into<String>) -> Self {
        Self::OnCondition(condition.into())
    }

    pub fn matches(&self, output: &NodeOutput) -> bool {
        match (self, output) {
            (EdgeCondition::Always, NodeOutput::Continue) => true,
            (EdgeCondition::OnCondition(expected), NodeOutput::Branch(actual)) => {
                expected == actual
            }
            _ => false,
        }
    }
}

enum Vertex {
    Node(Box<dyn Node>),
    End,
}

impl Vertex {
    fn id(&self) -> &str {
        match self {
            Vertex::Node(node) => node.id(),
            Vertex::End => END,
        }
    }
}

/// petgraph-based StateGraph runtime
pub struct GraphRuntime {
    graph: DiGraph<Vertex, EdgeCondition>,
    node_indices: HashMap<String, NodeIndex>,
    entry: NodeIndex,
    max_steps: usize,
}

impl GraphRuntime {
    pub fn entry_id(&self) -> &str {
        self.graph[self.entry].id()
    }

    /// Node ids in insertion order, without the terminal sentinel.
    pub fn node_ids(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter_map(|idx| match &self.graph[idx] {
                Vertex::Node(node) => Some(node.id()),
                Vertex::End => None,
            })
            .collect()
    }

    /// Target of `from` for `output`, if the edge table has one.
    pub fn successor(&self, from: &str, output: &NodeOutput) -> Option<&str> {
        let idx = self.node_indices.get(from)?;
        self.graph
            .edges_directed(*idx, Direction::Outgoing)
            .find(|edge| edge.weight().matches(output))
            .map(|edge| self.graph[edge.target()].id())
    }

    pub async fn run(&self, state: &mut GraphState, ctx: &NodeContext) -> Result<(), GraphError> {
        let mut current_idx = self.entry;
        let mut step = 0;

        loop {
            let node = match &self.graph[current_idx] {
                Vertex::End => {
                    tracing::debug!(run_id = %state.run_id, steps = step, "Graph execution complete");
                    return Ok(());
                }
                Vertex::Node(node) => node,
            };

            if step >= self.max_steps {
                return Err(GraphError::structural(
                    node.id(),
                    format!("maximum steps ({}) exceeded", self.max_steps),
                )
                .with_trace(&state.trace));
            }

            let node_id = node.id();
            tracing::debug!(
                run_id = %state.run_id,
                "Executing node: {} ({}, step {})",
                node_id,
                node.name(),
                step
            );
            state.trace.push(node_id.to_string());

            let output = node
                .execute(state, ctx)
                .await
                .map_err(|err| err.with_trace(&state.trace))?;

            current_idx = self
                .resolve_next_node(current_idx, &output)
                .map_err(|err| err.with_trace(&state.trace))?;
            step += 1;
        }
    }

    fn resolve_next_node(
        &self,
        current_idx: NodeIndex,
        output: &NodeOutput,
    ) -> Result<NodeIndex, GraphError> {
        self.graph
            .edges_directed(current_idx, Direction::Outgoing)
            .find(|edge| edge.weight().matches(output))
            .map(|edge| edge.target())
            .ok_or_else(|| {
                let current_id = self.graph[current_idx].id();
                GraphError::structural(
                    current_id,
                    format!("no edge from '{}' for {:?}", current_id, output),
                )
            })
    }
}

/// Builder for constructing graphs fluently
pub struct GraphBuilder {
    entry: Option<String>,
    max_steps: usize,
    nodes: Vec<Box<dyn Node>>,
    pending_edges: Vec<(String, String, EdgeCondition)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            entry: None,
            max_steps: 25,
            nodes: Vec::new(),
            pending_edges: Vec::new(),
        }
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.entry = Some(node_id.into());
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::Always));
        self
    }

    pub fn conditional_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::on(condition)));
        self
    }

    pub fn build(self) -> Result<GraphRuntime, GraphError> {
        if self.max_steps == 0 {
            return Err(GraphError::structural("builder", "max_steps must be at least 1"));
        }

        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        let mut routes: HashMap<String, &'static [&'static str]> = HashMap::new();

        let end_idx = graph.add_node(Vertex::End);
        node_indices.insert(END.to_string(), end_idx);

        for node in self.nodes {
            let id = node.id().to_string();
            if node_indices.contains_key(&id) {
                return Err(GraphError::structural(id.clone(), format!("duplicate node id: {}", id)));
            }
            routes.insert(id.clone(), node.routes());
            let idx = graph.add_node(Vertex::Node(node));
            node_indices.insert(id, idx);
        }

        let entry_id = self
            .entry
            .ok_or_else(|| GraphError::structural("builder", "no entry node set"))?;
        let entry = match node_indices.get(&entry_id) {
            Some(idx) if *idx != end_idx => *idx,
            _ => {
                return Err(GraphError::structural(
                    "builder",
                    format!("entry node not found: {}", entry_id),
                ))
            }
        };

        let mut seen: HashSet<(String, EdgeCondition)> = HashSet::new();
        for (from, to, condition) in self.pending_edges {
            let from_idx = match node_indices.get(&from) {
                Some(idx) if *idx != end_idx => *idx,
                _ => {
                    return Err(GraphError::structural(
                        from.clone(),
                        format!("source node not found: {}", from),
                    ))
                }
            };
            let to_idx = *node_indices.get(&to).ok_or_else(|| {
                GraphError::structural(from.clone(), format!("target node not found: {}", to))
            })?;

            let declared = routes.get(&from).copied().unwrap_or(&[]);
            match &condition {
                EdgeCondition::Always if !declared.is_empty() => {
                    return Err(GraphError::structural(
                        from.clone(),
                        format!("'{}' branches on {:?} and cannot have an unconditional edge", from, declared),
                    ));
                }
                EdgeCondition::OnCondition(name) if !declared.contains(&name.as_str()) => {
                    return Err(GraphError::structural(
                        from.clone(),
                        format!("'{}' does not declare condition '{}'", from, name),
                    ));
                }
                _ => {}
            }

            if !seen.insert((from.clone(), condition.clone())) {
                return Err(GraphError::structural(
                    from.clone(),
                    format!("duplicate edge from '{}' for {:?}", from, condition),
                ));
            }

            graph.add_edge(from_idx, to_idx, condition);
        }

        for (id, declared) in &routes {
            if declared.is_empty() {
                if !seen.contains(&(id.clone(), EdgeCondition::Always)) {
                    return Err(GraphError::structural(
                        id.clone(),
                        format!("'{}' has no outgoing edge", id),
                    ));
                }
                continue;
            }
            for condition in declared.iter() {
                if !seen.contains(&(id.clone(), EdgeCondition::on(*condition))) {
                    return Err(GraphError::structural(
                        id.clone(),
                        format!("'{}' has no edge for condition '{}'", id, condition),
                    ));
                }
            }
        }

        let mut reachable = HashSet::new();
        let mut dfs = Dfs::new(&graph, entry);
        while let Some(idx) = dfs.next(&graph) {
            reachable.insert(idx);
        }

        let mut reaches_end = HashSet::new();
        let reversed = Reversed(&graph);
        let mut dfs = Dfs::new(reversed, end_idx);
        while let Some(idx) = dfs.next(reversed) {
            reaches_end.insert(idx);
        }

        for idx in graph.node_indices() {
            if idx == end_idx {
                continue;
            }
            let id = graph[idx].id().to_string();
            if !reachable.contains(&idx) {
                return Err(GraphError::structural(
                    id.clone(),
                    format!("'{}' is unreachable from entry '{}'", id, entry_id),
                ));
            }
            if !reaches_end.contains(&idx) {
                return Err(GraphError::structural(
                    id.clone(),
                    format!("'{}' has no path to {}", id, END),
                ));
            }
        }

        Ok(GraphRuntime {
            graph,
            node_indices,
            entry,
            max_steps: self.max_steps,
        })
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
