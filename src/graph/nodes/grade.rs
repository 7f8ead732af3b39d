// Grade Documents Node
// Asks the grader model whether the retrieved document answers the question

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::core::errors::RagError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::prompts::{render, GRADER_PROMPT};
use crate::graph::state::GraphState;
use crate::llm::structured;
use crate::llm::{ChatMessage, Conversation, ToolArguments};

pub const ROUTE_RELEVANT: &str = "yes";
pub const ROUTE_NOT_RELEVANT: &str = "no";

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct RelevanceScore {
    /// Relevance score 'yes' or 'no'
    #[serde(rename = "binaryScore")]
    pub binary_score: String,
}

impl ToolArguments for RelevanceScore {
    const TOOL_NAME: &'static str = "give_relevance_score";
    const DESCRIPTION: &'static str = "Give a relevance score to the retrieved documents.";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelevanceGrade {
    Relevant,
    NotRelevant,
}

impl RelevanceGrade {
    pub fn parse(score: &str) -> Result<Self, RagError> {
        match score.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(RelevanceGrade::Relevant),
            "no" => Ok(RelevanceGrade::NotRelevant),
            other => Err(RagError::malformed(format!(
                "relevance score must be 'yes' or 'no', got '{}'",
                other
            ))),
        }
    }

    pub fn route(self) -> &'static str {
        match self {
            RelevanceGrade::Relevant => ROUTE_RELEVANT,
            RelevanceGrade::NotRelevant => ROUTE_NOT_RELEVANT,
        }
    }
}

pub struct GradeDocumentsNode;

impl GradeDocumentsNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GradeDocumentsNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for GradeDocumentsNode {
    fn id(&self) -> &'static str {
        "gradeDocuments"
    }

    fn name(&self) -> &'static str {
        "Relevance Grader"
    }

    fn routes(&self) -> &'static [&'static str] {
        &[ROUTE_RELEVANT, ROUTE_NOT_RELEVANT]
    }

    async fn execute(
        &self,
        state: &mut GraphState,
        ctx: &NodeContext,
    ) -> Result<NodeOutput, GraphError> {
        tracing::info!(run_id = %state.run_id, "Grading retrieved document");

        let prompt = {
            let question = state.question().map_err(|e| GraphError::new(self.id(), e))?;
            let context = state
                .conversation
                .last_tool_message()
                .map(|message| message.content.as_str())
                .ok_or_else(|| {
                    GraphError::new(self.id(), RagError::malformed("no tool result to grade"))
                })?;
            render(GRADER_PROMPT, &[("context", context), ("question", question)])
        };

        let reply = ctx
            .grader
            .complete(vec![ChatMessage::user(prompt)], vec![RelevanceScore::tool_spec()])
            .await
            .map_err(|e| GraphError::new(self.id(), e))?;
        state.conversation.push(reply);

        let grade = check_relevance(&state.conversation).map_err(|e| GraphError::new(self.id(), e))?;
        match grade {
            RelevanceGrade::Relevant => {
                tracing::info!(run_id = %state.run_id, "Decision: document relevant")
            }
            RelevanceGrade::NotRelevant => {
                tracing::info!(run_id = %state.run_id, "Decision: document not relevant")
            }
        }
        Ok(NodeOutput::Branch(grade.route().to_string()))
    }
}

/// Read the grade from the latest message, which must be the grader's
/// `give_relevance_score` call.
pub fn check_relevance(conversation: &Conversation) -> Result<RelevanceGrade, RagError> {
    let last = conversation
        .last()
        .ok_or_else(|| RagError::malformed("conversation is empty"))?;
    let score = structured::from_tool_call::<RelevanceScore>(last).into_result()?;
    RelevanceGrade::parse(&score.binary_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;
    use serde_json::json;

    fn grader_reply(arguments: serde_json::Value) -> Conversation {
        let mut conversation = Conversation::from_question("q");
        conversation.push(ChatMessage::assistant("").with_tool_calls(vec![ToolCall {
            id: None,
            name: RelevanceScore::TOOL_NAME.to_string(),
            arguments,
        }]));
        conversation
    }

    #[test]
    fn yes_and_no_route_to_their_branches() {
        let grade = check_relevance(&grader_reply(json!({"binaryScore": "yes"}))).unwrap();
        assert_eq!(grade.route(), ROUTE_RELEVANT);

        let grade = check_relevance(&grader_reply(json!({"binaryScore": " No "}))).unwrap();
        assert_eq!(grade, RelevanceGrade::NotRelevant);
    }

    #[test]
    fn malformed_grades_are_rejected() {
        let err = check_relevance(&grader_reply(json!({"binaryScore": "maybe"}))).unwrap_err();
        assert!(matches!(err, RagError::MalformedModelResponse(_)));

        let err = check_relevance(&grader_reply(json!({"score": "yes"}))).unwrap_err();
        assert!(matches!(err, RagError::MalformedModelResponse(_)));

        let mut conversation = Conversation::from_question("q");
        conversation.push(ChatMessage::assistant("yes"));
        let err = check_relevance(&conversation).unwrap_err();
        assert!(matches!(err, RagError::MalformedModelResponse(_)));
    }

    #[test]
    fn tool_schema_uses_wire_field_name() {
        let spec = RelevanceScore::tool_spec();
        assert_eq!(spec.name, "give_relevance_score");
        assert!(spec.parameters["properties"].get("binaryScore").is_some());
    }
}
