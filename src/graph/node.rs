// Node trait and types
// Base abstraction for graph nodes

use async_trait::async_trait;

use crate::core::config::GraphSettings;
use crate::core::errors::RagError;
use crate::rag::{Generator, Retriever};

use super::state::GraphState;

/// Services shared by every node of a run.
#[derive(Clone)]
pub struct NodeContext {
    pub retriever: Retriever,
    /// Decides whether to call the retrieval tool.
    pub agent: Generator,
    pub grader: Generator,
    pub rewriter: Generator,
    pub generator: Generator,
    pub settings: GraphSettings,
}

/// Output from a node execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutput {
    /// Follow the node's unconditional edge
    Continue,
    /// Follow the edge registered for this condition
    Branch(String),
}

/// Graph execution error
///
/// `execution_trace` lists the node ids visited before the failure, most
/// recent last.
#[derive(Debug)]
pub struct GraphError {
    pub node_id: String,
    pub source: RagError,
    pub execution_trace: Vec<String>,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, source: RagError) -> Self {
        Self {
            node_id: node_id.into(),
            source,
            execution_trace: Vec::new(),
        }
    }

    /// Structural failure: bad edge table, step limit, unmatched branch.
    pub fn structural(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(node_id, RagError::Graph(message.into()))
    }

    pub fn with_trace(mut self, trace: &[String]) -> Self {
        self.execution_trace = trace.to_vec();
        self
    }

    pub fn into_source(self) -> RagError {
        self.source
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "GraphError in {}: {}", self.node_id, self.source)
        } else {
            write!(
                f,
                "GraphError in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.source
            )
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Node trait - all graph nodes implement this
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node
    fn id(&self) -> &'static str;

    /// Human-readable name for display
    fn name(&self) -> &'static str {
        self.id()
    }

    /// Conditions this node may return in [`NodeOutput::Branch`]. A node with
    /// no routes always returns [`NodeOutput::Continue`].
    fn routes(&self) -> &'static [&'static str] {
        &[]
    }

    async fn execute(
        &self,
        state: &mut GraphState,
        ctx: &NodeContext,
    ) -> Result<NodeOutput, GraphError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_trace() {
        let err = GraphError::new("rewrite", RagError::RetryLimitExceeded(3))
            .with_trace(&["agent".to_string(), "retrieve".to_string()]);
        assert_eq!(
            err.to_string(),
            "GraphError in rewrite (trace: agent -> retrieve): rewrite limit of 3 exceeded"
        );
        assert!(matches!(err.into_source(), RagError::RetryLimitExceeded(3)));
    }
}
