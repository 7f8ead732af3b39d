//! Start -> Generate -> End retrieval pipeline.
//!
//! Each state carries only what is valid in it: no context before retrieval,
//! no answer before generation.

use crate::core::errors::RagError;
use crate::llm::{ChatMessage, Conversation};
use crate::rag::{Generator, Retrieved, Retriever};

/// Separates the question from the injected document in the first message.
pub const CONTEXT_HEADER: &str =
    "\n\nAnswer based only on the following document:\n";

#[derive(Debug, Clone)]
pub enum SimpleState {
    Start {
        conversation: Conversation,
    },
    Generate {
        conversation: Conversation,
        context: Retrieved,
    },
    End {
        conversation: Conversation,
        context: Retrieved,
    },
}

impl SimpleState {
    pub fn name(&self) -> &'static str {
        match self {
            SimpleState::Start { .. } => "start",
            SimpleState::Generate { .. } => "generate",
            SimpleState::End { .. } => "end",
        }
    }

    pub fn conversation(&self) -> &Conversation {
        match self {
            SimpleState::Start { conversation }
            | SimpleState::Generate { conversation, .. }
            | SimpleState::End { conversation, .. } => conversation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub answer: String,
    pub conversation: Conversation,
    pub context: Retrieved,
}

pub struct SimplePipeline {
    retriever: Retriever,
    generator: Generator,
}

impl SimplePipeline {
    pub fn new(retriever: Retriever, generator: Generator) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// One transition. `End` is returned unchanged.
    pub async fn advance(&self, state: SimpleState) -> Result<SimpleState, RagError> {
        match state {
            SimpleState::Start { mut conversation } => {
                let first = conversation.first_mut().ok_or_else(|| {
                    RagError::Graph("pipeline needs at least one message".to_string())
                })?;
                let context = self.retriever.retrieve(&first.content).await?;

                first.content.push_str(CONTEXT_HEADER);
                first.content.push_str(&context.text);

                Ok(SimpleState::Generate {
                    conversation,
                    context,
                })
            }
            SimpleState::Generate {
                mut conversation,
                context,
            } => {
                let reply = self.generator.generate(&conversation).await?;
                conversation.push(ChatMessage::assistant(reply.content));
                Ok(SimpleState::End {
                    conversation,
                    context,
                })
            }
            end @ SimpleState::End { .. } => Ok(end),
        }
    }

    pub async fn run(&self, conversation: Conversation) -> Result<PipelineOutcome, RagError> {
        let mut state = SimpleState::Start { conversation };

        loop {
            tracing::debug!(step = state.name(), "Pipeline step");
            state = match state {
                SimpleState::End {
                    conversation,
                    context,
                } => {
                    let answer = conversation
                        .last()
                        .map(|message| message.content.clone())
                        .unwrap_or_default();
                    return Ok(PipelineOutcome {
                        answer,
                        conversation,
                        context,
                    });
                }
                other => self.advance(other).await?,
            };
        }
    }

    pub async fn ask(&self, question: &str) -> Result<PipelineOutcome, RagError> {
        self.run(Conversation::from_question(question)).await
    }
}
