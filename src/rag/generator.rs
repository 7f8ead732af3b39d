use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;
use crate::llm::structured::{self, StructuredOutput};
use crate::llm::{
    ChatMessage, ChatRequest, Conversation, LlmProvider, Role, SamplingOptions, ToolSpec,
};

/// Answer with the website it was taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StructuredAnswer {
    /// answer to the user's question
    pub answer: String,
    /// source used to answer the user's question, should be a website.
    pub source: String,
}

/// Sends a conversation to the chat model and returns its reply.
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn LlmProvider>,
    model: String,
    options: SamplingOptions,
}

impl Generator {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>, options: SamplingOptions) -> Self {
        Self {
            provider,
            model: model.into(),
            options,
        }
    }

    /// The caller decides whether to append the reply.
    pub async fn generate(&self, conversation: &Conversation) -> Result<ChatMessage, RagError> {
        self.complete(conversation.messages().to_vec(), Vec::new())
            .await
    }

    /// Same as [`Generator::generate`] with `tools` bound to the request.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolSpec>,
    ) -> Result<ChatMessage, RagError> {
        let request = ChatRequest::new(messages)
            .with_tools(tools)
            .with_options(&self.options);
        let reply = self
            .provider
            .chat(request, &self.model)
            .await?;

        if reply.role != Role::Assistant {
            return Err(RagError::GenerationProvider(format!(
                "expected an assistant reply, got {}",
                reply.role.as_str()
            )));
        }

        tracing::debug!(
            model = %self.model,
            chars = reply.content.len(),
            tool_calls = reply.tool_calls.len(),
            "Generated reply"
        );
        Ok(reply)
    }

    /// Ask for an answer shaped as `T` and parse it from the reply text.
    pub async fn generate_structured<T>(&self, prompt: &str) -> Result<StructuredOutput<T>, RagError>
    where
        T: JsonSchema + serde::de::DeserializeOwned,
    {
        let content = format!("{}\n{}", prompt, structured::format_instructions::<T>());
        let conversation = Conversation::from(vec![ChatMessage::user(content)]);
        let reply = self.generate(&conversation).await?;
        Ok(structured::from_text(&reply.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recording {
        reply: String,
        seen: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl LlmProvider for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<ChatMessage, RagError> {
            self.seen.lock().unwrap().push(request);
            Ok(ChatMessage::assistant(self.reply.clone()))
        }

        async fn embed(&self, _inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(vec![])
        }
    }

    fn recording(reply: &str) -> Arc<Recording> {
        Arc::new(Recording {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn generate_sends_whole_conversation_without_appending() {
        let provider = recording("Use drizzle-kit.");
        let generator = Generator::new(
            provider.clone(),
            "llama3.2",
            SamplingOptions {
                temperature: Some(0.2),
                ..Default::default()
            },
        );

        let mut conversation = Conversation::from_question("How to use drizzle?");
        conversation.push(ChatMessage::assistant("earlier"));

        let reply = generator.generate(&conversation).await.unwrap();
        assert_eq!(reply.content, "Use drizzle-kit.");
        assert_eq!(conversation.len(), 2);

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].messages.len(), 2);
        assert_eq!(seen[0].temperature, Some(0.2));
    }

    #[tokio::test]
    async fn structured_answer_is_parsed_from_reply() {
        let provider = recording(
            "<think>hmm</think>```json\n{\"answer\": \"A runtime\", \"source\": \"https://deno.com\"}\n```",
        );
        let generator = Generator::new(provider.clone(), "deepseek-r1:1.5b", SamplingOptions::default());

        let output = generator
            .generate_structured::<StructuredAnswer>("What is a Deno?")
            .await
            .unwrap();
        let answer = output.into_result().unwrap();
        assert_eq!(answer.source, "https://deno.com");

        let seen = provider.seen.lock().unwrap();
        assert!(seen[0].messages[0].content.contains("JSON schema"));
    }
}
