//! Typed structured output from chat models.
//!
//! Argument schemas are derived from Rust types with `schemars`, bound to chat
//! requests as tools, and the model's replies are checked against the same
//! schema with `jsonschema` before being deserialized. Call sites match on
//! [`StructuredOutput`] instead of probing optional JSON fields.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::core::errors::RagError;
use super::types::{ChatMessage, Role, ToolSpec};

/// Arguments of a tool the model may call.
pub trait ToolArguments: JsonSchema + DeserializeOwned {
    const TOOL_NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn tool_spec() -> ToolSpec {
        ToolSpec {
            name: Self::TOOL_NAME.to_string(),
            description: Self::DESCRIPTION.to_string(),
            parameters: schema_of::<Self>(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructuredOutput<T> {
    Parsed(T),
    Invalid { reason: String },
}

impl<T> StructuredOutput<T> {
    fn invalid(reason: impl Into<String>) -> Self {
        StructuredOutput::Invalid {
            reason: reason.into(),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, StructuredOutput::Parsed(_))
    }

    pub fn into_result(self) -> Result<T, RagError> {
        match self {
            StructuredOutput::Parsed(value) => Ok(value),
            StructuredOutput::Invalid { reason } => Err(RagError::MalformedModelResponse(reason)),
        }
    }
}

pub fn schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({"type": "object"}))
}

/// Validate `value` against the schema of `T`, then deserialize it.
pub fn from_value<T: JsonSchema + DeserializeOwned>(value: &Value) -> StructuredOutput<T> {
    let schema = schema_of::<T>();
    let validator = match jsonschema::validator_for(&schema) {
        Ok(validator) => validator,
        Err(err) => return StructuredOutput::invalid(format!("invalid schema: {}", err)),
    };

    let errors: Vec<String> = validator.iter_errors(value).map(|e| e.to_string()).collect();
    if !errors.is_empty() {
        return StructuredOutput::invalid(format!(
            "arguments do not match schema: {}",
            errors.join("; ")
        ));
    }

    match serde_json::from_value(value.clone()) {
        Ok(parsed) => StructuredOutput::Parsed(parsed),
        Err(err) => StructuredOutput::invalid(err.to_string()),
    }
}

/// Read the arguments of `T`'s tool from the first tool call of an
/// assistant message.
pub fn from_tool_call<T: ToolArguments>(message: &ChatMessage) -> StructuredOutput<T> {
    if message.role != Role::Assistant {
        return StructuredOutput::invalid(format!(
            "expected an assistant message, got {}",
            message.role.as_str()
        ));
    }

    let Some(call) = message.first_tool_call() else {
        return StructuredOutput::invalid(format!(
            "expected a `{}` tool call, the message has none",
            T::TOOL_NAME
        ));
    };

    if call.name != T::TOOL_NAME {
        return StructuredOutput::invalid(format!(
            "expected a `{}` tool call, got `{}`",
            T::TOOL_NAME,
            call.name
        ));
    }

    from_value(&call.arguments)
}

/// Parse a JSON object out of free-form model text. Reasoning blocks and
/// markdown fences around the object are ignored.
pub fn from_text<T: JsonSchema + DeserializeOwned>(text: &str) -> StructuredOutput<T> {
    let visible = strip_thinking(text);
    let Some(candidate) = extract_json_object(&visible) else {
        return StructuredOutput::invalid("no JSON object in model output");
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => from_value(&value),
        Err(err) => StructuredOutput::invalid(format!("model output is not valid JSON: {}", err)),
    }
}

/// Prompt snippet telling the model which JSON shape to produce.
pub fn format_instructions<T: JsonSchema>() -> String {
    let schema = schema_of::<T>();
    let pretty = serde_json::to_string_pretty(&schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "The output should be formatted as a JSON instance that conforms to the JSON schema below.\n\
         Return only the JSON object, wrapped in ```json fences.\n\n\
         Here is the output schema:\n```\n{}\n```",
        pretty
    )
}

/// Remove `<think>...</think>` blocks emitted by reasoning models.
pub fn strip_thinking(text: &str) -> String {
    let mut rest = text;
    let mut out = String::with_capacity(text.len());

    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Show `<think>` blocks as a collapsed `<details>` section instead of
/// dropping them.
pub fn render_thinking(text: &str) -> String {
    text.replace("<think>", "<details><summary>Thinking...</summary>")
        .replace("</think>", "</details>")
}

fn extract_json_object(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ToolCall;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Echo {
        /// Text to echo back
        text: String,
    }

    impl ToolArguments for Echo {
        const TOOL_NAME: &'static str = "echo";
        const DESCRIPTION: &'static str = "Echo text";
    }

    fn call(name: &str, arguments: Value) -> ChatMessage {
        ChatMessage::assistant("").with_tool_calls(vec![ToolCall {
            id: None,
            name: name.to_string(),
            arguments,
        }])
    }

    #[test]
    fn tool_spec_exposes_argument_schema() {
        let spec = Echo::tool_spec();
        assert_eq!(spec.name, "echo");
        assert_eq!(spec.parameters["type"], "object");
        assert_eq!(spec.parameters["properties"]["text"]["type"], "string");
    }

    #[test]
    fn parses_matching_tool_call() {
        let output = from_tool_call::<Echo>(&call("echo", json!({"text": "hi"})));
        assert_eq!(
            output,
            StructuredOutput::Parsed(Echo {
                text: "hi".to_string()
            })
        );
    }

    #[test]
    fn rejects_missing_call_wrong_name_and_wrong_type() {
        assert!(!from_tool_call::<Echo>(&ChatMessage::assistant("no tools")).is_parsed());
        assert!(!from_tool_call::<Echo>(&call("other", json!({"text": "hi"}))).is_parsed());
        assert!(!from_tool_call::<Echo>(&call("echo", json!({"text": 42}))).is_parsed());
        assert!(!from_tool_call::<Echo>(&ChatMessage::user("hi")).is_parsed());
    }

    #[test]
    fn invalid_output_becomes_malformed_response() {
        let err = from_tool_call::<Echo>(&call("echo", json!({})))
            .into_result()
            .unwrap_err();
        assert!(matches!(err, RagError::MalformedModelResponse(_)));
    }

    #[test]
    fn parses_fenced_json_after_thinking() {
        let text = "<think>the user wants an echo</think>\nSure:\n```json\n{\"text\": \"hello\"}\n```";
        let parsed = from_text::<Echo>(text).into_result().unwrap();
        assert_eq!(parsed.text, "hello");
    }

    #[test]
    fn parses_bare_json_object() {
        let parsed = from_text::<Echo>("Answer: {\"text\": \"x\"} done").into_result().unwrap();
        assert_eq!(parsed.text, "x");
        assert!(!from_text::<Echo>("no json here").is_parsed());
    }

    #[test]
    fn strip_thinking_handles_unclosed_block() {
        assert_eq!(strip_thinking("a<think>b</think>c"), "ac");
        assert_eq!(strip_thinking("answer<think>never closed"), "answer");
    }

    #[test]
    fn format_instructions_embed_schema() {
        let instructions = format_instructions::<Echo>();
        assert!(instructions.contains("\"text\""));
        assert!(instructions.contains("JSON schema"));
    }

    #[test]
    fn render_thinking_wraps_reasoning() {
        assert_eq!(
            render_thinking("<think>plan</think>Deno 2.1 ships Wasm imports."),
            "<details><summary>Thinking...</summary>plan</details>Deno 2.1 ships Wasm imports."
        );
    }
}
