use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::errors::RagError;
use super::provider::{parse_embedding, parse_tool_arguments, LlmProvider};
use super::types::{ChatMessage, ChatRequest, Role, ToolCall};

/// OpenAI-compatible provider (LM Studio, llama.cpp server, vLLM, ...).
#[derive(Clone)]
pub struct LmStudioProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl LmStudioProvider {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.post(url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl LlmProvider for LmStudioProvider {
    fn name(&self) -> &str {
        "lmstudio"
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<ChatMessage, RagError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = build_chat_body(&request, model_id);

        let res = self
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(RagError::generation)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::GenerationProvider(format!(
                "LM Studio chat error: {}",
                text
            )));
        }

        let payload: Value = res.json().await.map_err(RagError::generation)?;
        parse_chat_response(&payload)
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, RagError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(RagError::embedding)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::EmbeddingProvider(format!(
                "LM Studio embed error: {}",
                text
            )));
        }

        let payload: Value = res.json().await.map_err(RagError::embedding)?;
        parse_embed_response(&payload)
    }
}

fn build_chat_body(request: &ChatRequest, model_id: &str) -> Value {
    let mut body = json!({
        "model": model_id,
        "messages": request.messages.iter().map(wire_message).collect::<Vec<_>>(),
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(t) = request.temperature { obj.insert("temperature".to_string(), json!(t)); }
        if let Some(t) = request.top_p { obj.insert("top_p".to_string(), json!(t)); }
        if let Some(t) = request.max_tokens { obj.insert("max_tokens".to_string(), json!(t)); }
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
            obj.insert("tools".to_string(), Value::Array(tools));
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
                .enumerate()
                .map(|(idx, call)| {
                    json!({
                        "id": call.id.clone().unwrap_or_else(|| format!("call_{}", idx)),
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        }
                    })
                })
                .collect();
            obj.insert("tool_calls".to_string(), Value::Array(calls));
        }
        if let Some(id) = &message.tool_call_id {
            obj.insert("tool_call_id".to_string(), json!(id));
        }
    }

    wire
}

fn parse_chat_response(payload: &Value) -> Result<ChatMessage, RagError> {
    let message = payload
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| RagError::GenerationProvider("response has no choices".to_string()))?;

    let content = message["content"].as_str().unwrap_or_default().to_string();

    let mut tool_calls = Vec::new();
    if let Some(calls) = message["tool_calls"].as_array() {
        for call in calls {
            let name = call["function"]["name"]
                .as_str()
                .ok_or_else(|| RagError::malformed("tool call without a function name"))?;
            tool_calls.push(ToolCall {
                id: call["id"].as_str().map(String::from),
                name: name.to_string(),
                arguments: parse_tool_arguments(&call["function"]["arguments"])?,
            });
        }
    }

    Ok(ChatMessage::new(Role::Assistant, content).with_tool_calls(tool_calls))
}

fn parse_embed_response(payload: &Value) -> Result<Vec<Vec<f32>>, RagError> {
    let data = payload["data"]
        .as_array()
        .ok_or_else(|| RagError::EmbeddingProvider("response has no data".to_string()))?;

    data.iter().map(|item| parse_embedding(&item["embedding"])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_arguments_are_sent_encoded() {
        let message = ChatMessage::assistant("").with_tool_calls(vec![ToolCall {
            id: Some("call_abc".to_string()),
            name: "retrieve_documents".to_string(),
            arguments: json!({"query": "drizzle"}),
        }]);

        let wire = wire_message(&message);
        assert_eq!(wire["tool_calls"][0]["id"], "call_abc");
        assert_eq!(wire["tool_calls"][0]["type"], "function");
        assert_eq!(
            wire["tool_calls"][0]["function"]["arguments"],
            "{\"query\":\"drizzle\"}"
        );
    }

    #[test]
    fn tool_result_references_call_id() {
        let message = ChatMessage::tool("retrieve_documents", "text")
            .with_tool_call_id(Some("call_abc".to_string()));
        let wire = wire_message(&message);
        assert_eq!(wire["tool_call_id"], "call_abc");
    }

    #[test]
    fn parses_openai_tool_call() {
        let payload = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "retrieve_documents", "arguments": "{\"query\":\"v2.1\"}"}
                    }]
                }
            }]
        });

        let message = parse_chat_response(&payload).unwrap();
        assert_eq!(message.content, "");
        let call = message.first_tool_call().unwrap();
        assert_eq!(call.id.as_deref(), Some("call_1"));
        assert_eq!(call.arguments["query"], "v2.1");
    }

    #[test]
    fn parses_embeddings_in_order() {
        let payload = json!({"data": [{"embedding": [1.0, 0.0]}, {"embedding": [0.0, 1.0]}]});
        let embeddings = parse_embed_response(&payload).unwrap();
        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }
}
