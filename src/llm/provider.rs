use async_trait::async_trait;
use serde_json::Value;

use crate::core::errors::RagError;
use super::types::{ChatMessage, ChatRequest};

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "ollama", "lmstudio")
    fn name(&self) -> &str;

    /// chat completion (non-streaming); the reply may carry tool calls
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<ChatMessage, RagError>;

    /// generate one embedding per input
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, RagError>;
}

/// Tool-call arguments arrive either as a JSON object (Ollama) or as a JSON
/// encoded string (OpenAI style). Both are normalized to a `Value`.
pub(crate) fn parse_tool_arguments(raw: &Value) -> Result<Value, RagError> {
    match raw {
        Value::String(encoded) if encoded.trim().is_empty() => {
            Ok(Value::Object(Default::default()))
        }
        Value::String(encoded) => serde_json::from_str(encoded).map_err(|e| {
            RagError::malformed(format!("tool arguments are not valid JSON: {}", e))
        }),
        Value::Null => Ok(Value::Object(Default::default())),
        other => Ok(other.clone()),
    }
}

pub(crate) fn parse_embedding(raw: &Value) -> Result<Vec<f32>, RagError> {
    let values = raw
        .as_array()
        .ok_or_else(|| RagError::EmbeddingProvider("embedding is not an array".to_string()))?;

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| RagError::EmbeddingProvider("embedding contains a non-number".to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn arguments_accept_object_and_encoded_string() {
        let object = parse_tool_arguments(&json!({"query": "deno"})).unwrap();
        let encoded = parse_tool_arguments(&json!("{\"query\":\"deno\"}")).unwrap();
        assert_eq!(object, encoded);
        assert_eq!(parse_tool_arguments(&Value::Null).unwrap(), json!({}));
    }

    #[test]
    fn arguments_reject_broken_json_string() {
        let err = parse_tool_arguments(&json!("{query:")).unwrap_err();
        assert!(matches!(err, RagError::MalformedModelResponse(_)));
    }

    #[test]
    fn embedding_rejects_non_numbers() {
        assert_eq!(parse_embedding(&json!([0.5, 1])).unwrap(), vec![0.5, 1.0]);
        assert!(parse_embedding(&json!([0.5, "x"])).is_err());
        assert!(parse_embedding(&json!({"a": 1})).is_err());
    }
}
