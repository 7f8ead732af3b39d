pub mod lmstudio;
pub mod ollama;
pub mod provider;
pub mod structured;
pub mod types;

pub use lmstudio::LmStudioProvider;
pub use ollama::OllamaProvider;
pub use provider::LlmProvider;
pub use structured::{StructuredOutput, ToolArguments};
pub use types::{ChatMessage, ChatRequest, Conversation, Role, SamplingOptions, ToolCall, ToolSpec};
