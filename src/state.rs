use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::settings::ModelSettings;
use crate::core::config::{AppConfig, AppPaths, ConfigService, ProviderKind};
use crate::core::errors::RagError;
use crate::graph::{GraphError, NodeContext, RagGraph};
use crate::llm::{LlmProvider, LmStudioProvider, OllamaProvider};
use crate::pipeline::SimplePipeline;
use crate::rag::{DocumentIndex, Generator, Retriever};

/// Loaded configuration plus the model provider it selects.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config_service: ConfigService,
    pub config: AppConfig,
    pub provider: Arc<dyn LlmProvider>,
    index_override: Option<PathBuf>,
}

impl AppState {
    pub fn initialize(
        paths: Arc<AppPaths>,
        config_path: Option<PathBuf>,
        index_override: Option<PathBuf>,
    ) -> Result<Self, RagError> {
        let config_service = ConfigService::new(paths.clone()).with_config_path(config_path);
        let config = config_service.load_config()?;
        let provider = build_provider(&config)?;

        tracing::debug!(
            provider = provider.name(),
            base_url = %config.llm.base_url,
            "Model provider ready"
        );

        Ok(Self {
            paths,
            config_service,
            config,
            provider,
            index_override,
        })
    }

    /// Assemble state from parts already built, e.g. a scripted provider.
    pub fn with_provider(
        paths: Arc<AppPaths>,
        config_service: ConfigService,
        config: AppConfig,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            paths,
            config_service,
            config,
            provider,
            index_override: None,
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.index_override
            .clone()
            .unwrap_or_else(|| self.config_service.index_path(&self.config))
    }

    pub fn load_index(&self) -> Result<Arc<DocumentIndex>, RagError> {
        let path = self.index_path();
        if !path.exists() {
            return Err(RagError::Storage(format!(
                "no index at {} (run `ragloop ingest` first)",
                path.display()
            )));
        }
        DocumentIndex::load(&path).map(Arc::new)
    }

    pub fn retriever(&self, index: Arc<DocumentIndex>) -> Retriever {
        Retriever::new(
            self.provider.clone(),
            index,
            self.config.models.embedding.clone(),
        )
    }

    pub fn generator(&self, model: &ModelSettings) -> Generator {
        Generator::new(
            self.provider.clone(),
            model.name.clone(),
            model.options.clone(),
        )
    }

    pub fn pipeline(&self, index: Arc<DocumentIndex>) -> SimplePipeline {
        SimplePipeline::new(self.retriever(index), self.generator(&self.config.models.chat))
    }

    pub fn rag_graph(&self, index: Arc<DocumentIndex>) -> Result<RagGraph, GraphError> {
        let models = &self.config.models;
        RagGraph::new(NodeContext {
            retriever: self.retriever(index),
            agent: self.generator(&models.agent),
            grader: self.generator(&models.grader),
            rewriter: self.generator(&models.rewriter),
            generator: self.generator(&models.generator),
            settings: self.config.graph.clone(),
        })
    }
}

fn build_provider(config: &AppConfig) -> Result<Arc<dyn LlmProvider>, RagError> {
    let llm = &config.llm;
    let provider: Arc<dyn LlmProvider> = match llm.provider {
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(
            llm.base_url.clone(),
            llm.request_timeout(),
        )?),
        ProviderKind::Lmstudio => Arc::new(LmStudioProvider::new(
            llm.base_url.clone(),
            llm.api_key.clone(),
            llm.request_timeout(),
        )?),
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_index_points_at_ingest() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::with_data_dir(
            tmp.path().to_path_buf(),
            tmp.path().join("data"),
        ));
        let state = AppState::initialize(paths, Some(tmp.path().join("config.yml")), None).unwrap();

        assert_eq!(state.provider.name(), "ollama");
        let err = state.load_index().unwrap_err();
        assert!(err.to_string().contains("ragloop ingest"));
    }

    #[test]
    fn index_override_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::with_data_dir(
            tmp.path().to_path_buf(),
            tmp.path().join("data"),
        ));
        let custom = tmp.path().join("custom.json");
        let state = AppState::initialize(
            paths,
            Some(tmp.path().join("config.yml")),
            Some(custom.clone()),
        )
        .unwrap();
        assert_eq!(state.index_path(), custom);
    }
}
