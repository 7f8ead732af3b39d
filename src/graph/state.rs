// Graph run state
// Owned by one run, mutated only by the node currently executing

use uuid::Uuid;

use crate::core::errors::RagError;
use crate::llm::{Conversation, Role};

#[derive(Debug, Clone)]
pub struct GraphState {
    pub run_id: Uuid,
    pub conversation: Conversation,
    /// Number of times `rewrite` has run in this graph run.
    pub rewrites: usize,
    /// Node ids in execution order.
    pub trace: Vec<String>,
}

impl GraphState {
    pub fn new(conversation: Conversation) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            conversation,
            rewrites: 0,
            trace: Vec::new(),
        }
    }

    pub fn from_question(question: impl Into<String>) -> Self {
        Self::new(Conversation::from_question(question))
    }

    /// Content of the first message.
    pub fn question(&self) -> Result<&str, RagError> {
        self.conversation
            .first()
            .map(|message| message.content.as_str())
            .ok_or_else(|| RagError::Graph("conversation is empty".to_string()))
    }

    /// The latest assistant message without tool calls, if the run produced one.
    pub fn answer(&self) -> Option<&str> {
        self.conversation
            .last()
            .filter(|message| message.role == Role::Assistant && !message.has_tool_calls())
            .map(|message| message.content.as_str())
    }
}
