use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;
use crate::llm::LlmProvider;
use crate::vector_math::is_zero_vector;

use super::store::DocumentIndex;

/// The document chosen for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retrieved {
    pub text: String,
    pub source: String,
    pub score: f32,
}

/// Embeds a query and looks up the closest document.
#[derive(Clone)]
pub struct Retriever {
    provider: Arc<dyn LlmProvider>,
    index: Arc<DocumentIndex>,
    embedding_model: String,
}

impl Retriever {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        index: Arc<DocumentIndex>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            index,
            embedding_model: embedding_model.into(),
        }
    }

    pub async fn retrieve(&self, query: &str) -> Result<Retrieved, RagError> {
        let embedding = self.embed_query(query).await?;
        let hit = self.index.nearest(&embedding)?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            for (rank, candidate) in self.index.top_k(&embedding, 3)?.iter().enumerate() {
                tracing::debug!(
                    rank,
                    source = %candidate.document.source,
                    score = candidate.score,
                    "Candidate document"
                );
            }
        }

        tracing::info!(
            source = %hit.document.source,
            score = hit.score,
            "Retrieved document"
        );

        Ok(Retrieved {
            text: hit.document.text.clone(),
            source: hit.document.source.clone(),
            score: hit.score,
        })
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, RagError> {
        let inputs = [query.to_string()];
        let embedding = self
            .provider
            .embed(&inputs, &self.embedding_model)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                RagError::EmbeddingProvider(format!(
                    "{} returned no embedding for the query",
                    self.provider.name()
                ))
            })?;

        if embedding.is_empty() || is_zero_vector(&embedding) {
            return Err(RagError::DegenerateVector(
                "query embedding has zero magnitude".to_string(),
            ));
        }

        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, ChatRequest};
    use crate::rag::store::EmbeddedDocument;
    use async_trait::async_trait;

    struct FixedEmbedding(Option<Vec<f32>>);

    #[async_trait]
    impl LlmProvider for FixedEmbedding {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<ChatMessage, RagError> {
            Err(RagError::GenerationProvider("not used".to_string()))
        }

        async fn embed(&self, _inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, RagError> {
            match &self.0 {
                Some(v) => Ok(vec![v.clone()]),
                None => Err(RagError::EmbeddingProvider("connection refused".to_string())),
            }
        }
    }

    fn index() -> Arc<DocumentIndex> {
        Arc::new(
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
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn retrieves_closest_document() {
        let retriever = Retriever::new(Arc::new(FixedEmbedding(Some(vec![0.9, 0.1]))), index(), "embed");
        let retrieved = retriever.retrieve("anything").await.unwrap();
        assert_eq!(retrieved.text, "A");
        assert_eq!(retrieved.source, "u1");
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let retriever = Retriever::new(Arc::new(FixedEmbedding(None)), index(), "embed");
        let err = retriever.retrieve("anything").await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingProvider(_)));
    }

    #[tokio::test]
    async fn zero_query_embedding_is_rejected() {
        let retriever = Retriever::new(Arc::new(FixedEmbedding(Some(vec![0.0, 0.0]))), index(), "embed");
        let err = retriever.retrieve("anything").await.unwrap_err();
        assert!(matches!(err, RagError::DegenerateVector(_)));
    }

    #[tokio::test]
    async fn small_but_nonzero_query_embedding_is_accepted() {
        let retriever = Retriever::new(Arc::new(FixedEmbedding(Some(vec![1e-4, 0.0]))), index(), "embed");
        let retrieved = retriever.retrieve("anything").await.unwrap();
        assert_eq!(retrieved.source, "u1");
        assert!((retrieved.score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn wrong_dimension_query_fails() {
        let retriever = Retriever::new(Arc::new(FixedEmbedding(Some(vec![1.0, 0.0, 0.0]))), index(), "embed");
        let err = retriever.retrieve("anything").await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { .. }));
    }
}
