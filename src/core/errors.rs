use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("degenerate vector: {0}")]
    DegenerateVector(String),
    #[error("document index is empty")]
    EmptyIndex,
    #[error("embedding provider error: {0}")]
    EmbeddingProvider(String),
    #[error("generation provider error: {0}")]
    GenerationProvider(String),
    #[error("malformed model response: {0}")]
    MalformedModelResponse(String),
    #[error("rewrite limit of {0} exceeded")]
    RetryLimitExceeded(usize),
    #[error("graph error: {0}")]
    Graph(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("ingestion error: {0}")]
    Ingestion(String),
}

impl RagError {
    pub fn embedding<E: std::fmt::Display>(err: E) -> Self {
        RagError::EmbeddingProvider(err.to_string())
    }

    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        RagError::GenerationProvider(err.to_string())
    }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        RagError::Storage(err.to_string())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        RagError::MalformedModelResponse(message.into())
    }
}
