// Graph Builder
// Wires the retrieval agent graph and runs it over a question

use super::node::{GraphError, NodeContext};
use super::nodes::{
    AgentNode, GenerateNode, GradeDocumentsNode, RetrieveNode, RewriteNode, ROUTE_END,
    ROUTE_NOT_RELEVANT, ROUTE_RELEVANT, ROUTE_RETRIEVE,
};
use super::runtime::{GraphBuilder, GraphRuntime, END};
use super::state::GraphState;
use crate::core::errors::RagError;
use crate::llm::Conversation;

/// Build the retrieval agent graph
///
/// ```text
/// agent --retrieve--> retrieve --> gradeDocuments --yes--> generate --> END
///   |  ^                                 |
///   |  +---------- rewrite <-----no------+
///   +--end--> END
/// ```
pub fn build_rag_graph(max_steps: usize) -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry("agent")
        .max_steps(max_steps)
        .node(Box::new(AgentNode::new()))
        .node(Box::new(RetrieveNode::new()))
        .node(Box::new(GradeDocumentsNode::new()))
        .node(Box::new(RewriteNode::new()))
        .node(Box::new(GenerateNode::new()))
        .conditional_edge("agent", "retrieve", ROUTE_RETRIEVE)
        .conditional_edge("agent", END, ROUTE_END)
        .edge("retrieve", "gradeDocuments")
        .conditional_edge("gradeDocuments", "generate", ROUTE_RELEVANT)
        .conditional_edge("gradeDocuments", "rewrite", ROUTE_NOT_RELEVANT)
        .edge("rewrite", "agent")
        .edge("generate", END)
        .build()
}

/// Smallest `max_steps` that lets a run use all of its rewrites.
///
/// The first pass is `agent`, `retrieve`, `gradeDocuments`; each rewrite adds
/// `rewrite`, `agent`, `retrieve`, `gradeDocuments`; the run then ends in
/// `generate` or a refused `rewrite`.
pub fn min_steps_for(max_rewrites: usize) -> usize {
    4 * (max_rewrites + 1)
}

/// The retrieval agent graph bound to its services.
pub struct RagGraph {
    runtime: GraphRuntime,
    ctx: NodeContext,
}

impl RagGraph {
    pub fn new(ctx: NodeContext) -> Result<Self, GraphError> {
        let runtime = build_rag_graph(ctx.settings.max_steps)?;
        Ok(Self { runtime, ctx })
    }

    pub fn runtime(&self) -> &GraphRuntime {
        &self.runtime
    }

    pub async fn invoke(&self, question: &str) -> Result<GraphState, GraphError> {
        self.invoke_conversation(Conversation::from_question(question))
            .await
    }

    /// Run the graph to `END`. The first message is the question every node
    /// refers back to.
    pub async fn invoke_conversation(
        &self,
        conversation: Conversation,
    ) -> Result<GraphState, GraphError> {
        if conversation.is_empty() {
            return Err(GraphError::new(
                "runtime",
                RagError::Graph("conversation is empty".to_string()),
            ));
        }

        let mut state = GraphState::new(conversation);
        tracing::info!(run_id = %state.run_id, "Starting agent graph");
        self.runtime.run(&mut state, &self.ctx).await?;
        tracing::info!(
            run_id = %state.run_id,
            rewrites = state.rewrites,
            trace = %state.trace.join(" -> "),
            "Agent graph finished"
        );
        Ok(state)
    }
}
