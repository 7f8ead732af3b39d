// Rewrite Node
// Reformulates the original question after an irrelevant retrieval

use async_trait::async_trait;

use crate::core::errors::RagError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::prompts::{render, REWRITE_PROMPT};
use crate::graph::state::GraphState;
use crate::llm::structured::strip_thinking;
use crate::llm::ChatMessage;

pub struct RewriteNode;

impl RewriteNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RewriteNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RewriteNode {
    fn id(&self) -> &'static str {
        "rewrite"
    }

    fn name(&self) -> &'static str {
        "Query Rewriter"
    }

    async fn execute(
        &self,
        state: &mut GraphState,
        ctx: &NodeContext,
    ) -> Result<NodeOutput, GraphError> {
        let max_rewrites = ctx.settings.max_rewrites;
        if state.rewrites >= max_rewrites {
            tracing::warn!(run_id = %state.run_id, max_rewrites, "Rewrite limit reached");
            return Err(GraphError::new(
                self.id(),
                RagError::RetryLimitExceeded(max_rewrites),
            ));
        }

        tracing::info!(run_id = %state.run_id, attempt = state.rewrites + 1, "Transforming query");
        let prompt = {
            let question = state.question().map_err(|e| GraphError::new(self.id(), e))?;
            render(REWRITE_PROMPT, &[("question", question)])
        };

        let reply = ctx
            .rewriter
            .complete(vec![ChatMessage::user(prompt)], Vec::new())
            .await
            .map_err(|e| GraphError::new(self.id(), e))?;

        let improved = strip_thinking(&reply.content);
        if improved.is_empty() {
            return Err(GraphError::new(
                self.id(),
                RagError::malformed("rewrite model returned an empty question"),
            ));
        }

        tracing::debug!(run_id = %state.run_id, question = %improved, "Rewritten question");
        state.rewrites += 1;
        state.conversation.push(ChatMessage::user(improved));
        Ok(NodeOutput::Continue)
    }
}
