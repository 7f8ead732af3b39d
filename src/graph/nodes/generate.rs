// Generate Node
// Answers the original question from the latest retrieved document

use async_trait::async_trait;

use crate::core::errors::RagError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::prompts::{render, GENERATE_PROMPT};
use crate::graph::state::GraphState;
use crate::llm::ChatMessage;

pub struct GenerateNode;

impl GenerateNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GenerateNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for GenerateNode {
    fn id(&self) -> &'static str {
        "generate"
    }

    fn name(&self) -> &'static str {
        "Answer Generator"
    }

    async fn execute(
        &self,
        state: &mut GraphState,
        ctx: &NodeContext,
    ) -> Result<NodeOutput, GraphError> {
        tracing::info!(run_id = %state.run_id, "Generating answer");

        let prompt = {
            let question = state.question().map_err(|e| GraphError::new(self.id(), e))?;
            let context = state
                .conversation
                .last_tool_message()
                .map(|message| message.content.as_str())
                .ok_or_else(|| {
                    GraphError::new(
                        self.id(),
                        RagError::malformed("no tool message found in the conversation"),
                    )
                })?;
            render(GENERATE_PROMPT, &[("question", question), ("context", context)])
        };

        let reply = ctx
            .generator
            .complete(vec![ChatMessage::user(prompt)], Vec::new())
            .await
            .map_err(|e| GraphError::new(self.id(), e))?;
        state.conversation.push(reply);
        Ok(NodeOutput::Continue)
    }
}
