use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};

use crate::core::errors::RagError;
use super::provider::{parse_embedding, parse_tool_arguments, LlmProvider};
use super::types::{ChatMessage, ChatRequest, Role, ToolCall, ToolSpec};

/// Client for Ollama's native `/api/chat` and `/api/embed` endpoints.
#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<ChatMessage, RagError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = build_chat_body(&request, model_id);

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(RagError::generation)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::GenerationProvider(format!(
                "Ollama chat error {}: {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(RagError::generation)?;
        parse_chat_response(&payload)
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, RagError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(RagError::embedding)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::EmbeddingProvider(format!(
                "Ollama embed error {}: {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(RagError::embedding)?;
        parse_embed_response(&payload, inputs.len())
    }
}

fn build_chat_body(request: &ChatRequest, model_id: &str) -> Value {
    let mut body = json!({
        "model": model_id,
        "messages": request.messages.iter().map(wire_message).collect::<Vec<_>>(),
        "stream": false,
    });

    let mut options = Map::new();
    if let Some(t) = request.temperature { options.insert("temperature".to_string(), json!(t)); }
    if let Some(t) = request.top_p { options.insert("top_p".to_string(), json!(t)); }
    if let Some(t) = request.max_tokens { options.insert("num_predict".to_string(), json!(t)); }

    if let Some(obj) = body.as_object_mut() {
        if !options.is_empty() {
            obj.insert("options".to_string(), Value::Object(options));
        }
        if !request.tools.is_empty() {
            obj.insert(
                "tools".to_string(),
                Value::Array(request.tools.iter().map(wire_tool).collect()),
            );
        }
    }

    body
}

fn wire_message(message: &ChatMessage) -> Value {
    let mut wire = json!({
        "role": message.role.as_str(),
        "content": message.content,
    });

    if let Some(obj) = wire.as_object_mut() {
        if message.has_tool_calls() {
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| json!({"function": {"name": call.name, "arguments": call.arguments}}))
                .collect();
            obj.insert("tool_calls".to_string(), Value::Array(calls));
        }
        if let Some(tool_name) = &message.tool_name {
            obj.insert("tool_name".to_string(), json!(tool_name));
        }
    }

    wire
}

fn wire_tool(tool: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

fn parse_chat_response(payload: &Value) -> Result<ChatMessage, RagError> {
    let message = payload
        .get("message")
        .ok_or_else(|| RagError::GenerationProvider("Ollama response has no message".to_string()))?;

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let mut tool_calls = Vec::new();
    if let Some(calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for call in calls {
            let function = &call["function"];
            let name = function["name"]
                .as_str()
                .ok_or_else(|| RagError::malformed("tool call without a function name"))?;
            tool_calls.push(ToolCall {
                id: call.get("id").and_then(|v| v.as_str()).map(String::from),
                name: name.to_string(),
                arguments: parse_tool_arguments(&function["arguments"])?,
            });
        }
    }

    Ok(ChatMessage::new(Role::Assistant, content).with_tool_calls(tool_calls))
}

fn parse_embed_response(payload: &Value, expected: usize) -> Result<Vec<Vec<f32>>, RagError> {
    let embeddings = payload
        .get("embeddings")
        .and_then(|v| v.as_array())
        .ok_or_else(|| RagError::EmbeddingProvider("Ollama response has no embeddings".to_string()))?
        .iter()
        .map(parse_embedding)
        .collect::<Result<Vec<_>, _>>()?;

    if embeddings.len() != expected {
        return Err(RagError::EmbeddingProvider(format!(
            "expected {} embeddings, got {}",
            expected,
            embeddings.len()
        )));
    }

    Ok(embeddings)
}
