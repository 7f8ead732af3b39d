pub mod core;
pub mod graph;
pub mod llm;
pub mod pipeline;
pub mod rag;
pub mod state;
pub mod vector_math;

pub use crate::core::errors::RagError;
