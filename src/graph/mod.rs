// Retrieval agent graph
// StateGraph-style orchestration on petgraph

pub mod builder;
pub mod node;
pub mod prompts;
pub mod runtime;
pub mod state;

pub mod nodes;

pub use builder::{build_rag_graph, min_steps_for, RagGraph};
pub use node::{GraphError, Node, NodeContext, NodeOutput};
pub use runtime::{EdgeCondition, GraphBuilder, GraphRuntime, END};
pub use state::GraphState;
