use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::llm::SamplingOptions;
use crate::rag::RAGConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    Lmstudio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl LlmSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    pub name: String,
    #[serde(flatten)]
    pub options: SamplingOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsSettings {
    pub embedding: String,
    /// Model of the simple ask pipeline.
    pub chat: ModelSettings,
    pub agent: ModelSettings,
    pub grader: ModelSettings,
    pub rewriter: ModelSettings,
    pub generator: ModelSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexSettings {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    pub urls: Vec<String>,
    #[serde(flatten)]
    pub engine: RAGConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSettings {
    /// How many times `rewrite` may send the question back to `agent`.
    pub max_rewrites: usize,
    pub max_steps: usize,
    pub tool_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub models: ModelsSettings,
    #[serde(default)]
    pub index: IndexSettings,
    pub ingest: IngestSettings,
    pub graph: GraphSettings,
}
