// Agent Node
// Lets the chat model decide whether to call the retrieval tool

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::GraphState;
use crate::llm::{ChatMessage, Conversation, Role, ToolArguments};

use super::grade::RelevanceScore;
use super::retrieve::RetrieveArgs;

pub const ROUTE_RETRIEVE: &str = "retrieve";
pub const ROUTE_END: &str = "end";

pub struct AgentNode;

impl AgentNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AgentNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for AgentNode {
    fn id(&self) -> &'static str {
        "agent"
    }

    fn name(&self) -> &'static str {
        "Agent"
    }

    fn routes(&self) -> &'static [&'static str] {
        &[ROUTE_RETRIEVE, ROUTE_END]
    }

    async fn execute(
        &self,
        state: &mut GraphState,
        ctx: &NodeContext,
    ) -> Result<NodeOutput, GraphError> {
        tracing::info!(run_id = %state.run_id, "Calling agent");

        let messages: Vec<ChatMessage> = state
            .conversation
            .iter()
            .filter(|message| !is_grading_call(message))
            .cloned()
            .collect();
        let tool = RetrieveArgs::tool_spec().with_description(ctx.settings.tool_description.clone());

        let reply = ctx
            .agent
            .complete(messages, vec![tool])
            .await
            .map_err(|e| GraphError::new(self.id(), e))?;
        state.conversation.push(reply);

        let route = should_retrieve(&state.conversation);
        if route == ROUTE_RETRIEVE {
            tracing::info!(run_id = %state.run_id, "Decision: retrieve");
        } else {
            tracing::info!(run_id = %state.run_id, "Decision: answer without retrieval");
        }
        Ok(NodeOutput::Branch(route.to_string()))
    }
}

/// Route after `agent`: retrieve when the latest assistant message requests a
/// tool call, otherwise end.
pub fn should_retrieve(conversation: &Conversation) -> &'static str {
    match conversation.last() {
        Some(message) if message.role == Role::Assistant && message.has_tool_calls() => {
            ROUTE_RETRIEVE
        }
        _ => ROUTE_END,
    }
}

/// Grader replies stay in the conversation but are hidden from the agent.
fn is_grading_call(message: &ChatMessage) -> bool {
    message.role == Role::Assistant
        && message
            .first_tool_call()
            .is_some_and(|call| call.name == RelevanceScore::TOOL_NAME)
}
