// Retrieve Node
// Executes the retrieval tool requested by the agent

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::core::errors::RagError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::GraphState;
use crate::llm::structured;
use crate::llm::{ChatMessage, ToolArguments};

/// Arguments of the retrieval tool.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct RetrieveArgs {
    /// Search query
    pub query: String,
}

impl ToolArguments for RetrieveArgs {
    const TOOL_NAME: &'static str = "retrieve_blog_posts";
    const DESCRIPTION: &'static str =
        "Search and return information about Deno from various blog posts.";
}

pub struct RetrieveNode;

impl RetrieveNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RetrieveNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RetrieveNode {
    fn id(&self) -> &'static str {
        "retrieve"
    }

    fn name(&self) -> &'static str {
        "Retrieval Tool"
    }

    async fn execute(
        &self,
        state: &mut GraphState,
        ctx: &NodeContext,
    ) -> Result<NodeOutput, GraphError> {
        let request = state
            .conversation
            .last()
            .ok_or_else(|| GraphError::new(self.id(), RagError::malformed("no tool request to execute")))?;
        let call_id = request.first_tool_call().and_then(|call| call.id.clone());

        let args = structured::from_tool_call::<RetrieveArgs>(request)
            .into_result()
            .map_err(|e| GraphError::new(self.id(), e))?;

        tracing::info!(run_id = %state.run_id, query = %args.query, "Running retrieval tool");
        let retrieved = ctx
            .retriever
            .retrieve(&args.query)
            .await
            .map_err(|e| GraphError::new(self.id(), e))?;

        state.conversation.push(
            ChatMessage::tool(RetrieveArgs::TOOL_NAME, retrieved.text).with_tool_call_id(call_id),
        );
        Ok(NodeOutput::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::structured::StructuredOutput;
    use crate::llm::ToolCall;
    use serde_json::json;

    #[test]
    fn parses_query_argument() {
        let message = ChatMessage::assistant("").with_tool_calls(vec![ToolCall {
            id: Some("call_0".to_string()),
            name: RetrieveArgs::TOOL_NAME.to_string(),
            arguments: json!({"query": "Deno 2.1 features"}),
        }]);

        let parsed = structured::from_tool_call::<RetrieveArgs>(&message);
        assert_eq!(
            parsed,
            StructuredOutput::Parsed(RetrieveArgs {
                query: "Deno 2.1 features".to_string()
            })
        );
    }

    #[test]
    fn rejects_other_tools_and_bad_arguments() {
        let other = ChatMessage::assistant("").with_tool_calls(vec![ToolCall {
            id: None,
            name: "web_search".to_string(),
            arguments: json!({"query": "x"}),
        }]);
        assert!(!structured::from_tool_call::<RetrieveArgs>(&other).is_parsed());

        let bad = ChatMessage::assistant("").with_tool_calls(vec![ToolCall {
            id: None,
            name: RetrieveArgs::TOOL_NAME.to_string(),
            arguments: json!({"q": 1}),
        }]);
        assert!(!structured::from_tool_call::<RetrieveArgs>(&bad).is_parsed());
    }
}
