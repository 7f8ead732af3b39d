#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use ragloop::core::config::GraphSettings;
use ragloop::graph::NodeContext;
use ragloop::llm::{ChatMessage, ChatRequest, LlmProvider, SamplingOptions, ToolCall};
use ragloop::rag::{DocumentIndex, EmbeddedDocument, Generator, Retriever};
use ragloop::RagError;

/// Replays chat replies in call order and embeds every input as one fixed
/// vector.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<ChatMessage, RagError>>>,
    embedding: Vec<f32>,
    pub chats: Mutex<Vec<(String, ChatRequest)>>,
    pub embeds: Mutex<Vec<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn new(embedding: Vec<f32>, replies: Vec<Result<ChatMessage, RagError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            embedding,
            chats: Mutex::new(Vec::new()),
            embeds: Mutex::new(Vec::new()),
        })
    }

    pub fn chat_models(&self) -> Vec<String> {
        self.chats
            .lock()
            .unwrap()
            .iter()
            .map(|(model, _)| model.clone())
            .collect()
    }

    pub fn embed_calls(&self) -> usize {
        self.embeds.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<ChatMessage, RagError> {
        self.chats
            .lock()
            .unwrap()
            .push((model_id.to_string(), request));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RagError::GenerationProvider("script exhausted".to_string())))
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, RagError> {
        self.embeds.lock().unwrap().push(inputs.to_vec());
        Ok(inputs.iter().map(|_| self.embedding.clone()).collect())
    }
}

pub fn tool_call(name: &str, arguments: Value) -> ChatMessage {
    ChatMessage::assistant("").with_tool_calls(vec![ToolCall {
        id: Some("call_0".to_string()),
        name: name.to_string(),
        arguments,
    }])
}

/// `[1,0] -> "A" (u1)` and `[0,1] -> "B" (u2)`.
pub fn two_doc_index() -> DocumentIndex {
    DocumentIndex::from_documents(vec![
        EmbeddedDocument {
            embedding: vec![1.0, 0.0],
            text: "A".to_string(),
            source: "u1".to_string(),
        },
        EmbeddedDocument {
            embedding: vec![0.0, 1.0],
            text: "B".to_string(),
            source: "u2".to_string(),
        },
    ])
    .unwrap()
}

pub fn node_context(provider: Arc<ScriptedProvider>, max_rewrites: usize, max_steps: usize) -> NodeContext {
    let generator = |model: &str| {
        Generator::new(
            provider.clone(),
            model,
            SamplingOptions {
                temperature: Some(0.0),
                ..Default::default()
            },
        )
    };

    NodeContext {
        retriever: Retriever::new(provider.clone(), Arc::new(two_doc_index()), "embed-model"),
        agent: generator("agent-model"),
        grader: generator("grader-model"),
        rewriter: generator("rewriter-model"),
        generator: generator("generator-model"),
        settings: GraphSettings {
            max_rewrites,
            max_steps,
            tool_description: "Search Deno blog posts.".to_string(),
        },
    }
}
