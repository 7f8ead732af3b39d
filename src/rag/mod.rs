//! RAG (Retrieval-Augmented Generation) module.
//!
//! This module provides:
//! - `DocumentIndex`: the persisted embeddings with nearest-neighbour lookup
//! - `Retriever` / `Generator`: the retrieval and generation steps
//! - `RAGEngine`: ingestion of web pages into a `DocumentIndex`

mod engine;
mod generator;
mod retriever;
mod store;

pub use engine::{extract_body_text, RAGConfig, RAGEngine, TextChunk};
pub use generator::{Generator, StructuredAnswer};
pub use retriever::{Retrieved, Retriever};
pub use store::{DocumentIndex, EmbeddedDocument, ScoredDocument};
