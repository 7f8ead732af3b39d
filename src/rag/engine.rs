//! Ingestion engine: builds the document index from web pages.
//!
//! Fetches each configured URL, extracts the text under `<body>`, splits it
//! into overlapping chunks, embeds every chunk and returns the resulting
//! [`DocumentIndex`]. Pages are processed concurrently; the index keeps the
//! configured URL order.

use std::time::Duration;

use futures_util::future::try_join_all;
use scraper::{Html, Node, Selector};
use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;
use crate::llm::LlmProvider;

use super::store::{DocumentIndex, EmbeddedDocument};

/// Configuration for the RAG engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RAGConfig {
    /// Maximum chunk size in characters (0 keeps each page whole)
    pub chunk_size: usize,
    /// Overlap between chunks
    pub chunk_overlap: usize,
    /// Maximum chunks taken from a single page
    pub max_chunks_per_source: usize,
    /// Timeout for web requests in seconds
    pub web_timeout_secs: u64,
}

impl Default for RAGConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            max_chunks_per_source: 200,
            web_timeout_secs: 30,
        }
    }
}

/// A text chunk with source information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    /// The text content
    pub text: String,
    /// Source identifier (URL, filename, etc.)
    pub source: String,
    /// Character offset in original document
    pub start_offset: usize,
    /// Chunk index within the source
    pub chunk_index: usize,
}

pub struct RAGEngine {
    config: RAGConfig,
    client: reqwest::Client,
}

impl RAGEngine {
    pub fn new(config: RAGConfig) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.web_timeout_secs))
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Fetch every URL, embed its chunks and assemble the index.
    pub async fn build_index(
        &self,
        urls: &[String],
        provider: &dyn LlmProvider,
        embedding_model: &str,
    ) -> Result<DocumentIndex, RagError> {
        let per_url = try_join_all(
            urls.iter()
                .map(|url| self.embed_url(url, provider, embedding_model)),
        )
        .await?;

        let documents: Vec<EmbeddedDocument> = per_url.into_iter().flatten().collect();
        tracing::info!(
            "Split {} pages into {} embedded documents",
            urls.len(),
            documents.len()
        );

        DocumentIndex::from_documents(documents)
    }

    async fn embed_url(
        &self,
        url: &str,
        provider: &dyn LlmProvider,
        embedding_model: &str,
    ) -> Result<Vec<EmbeddedDocument>, RagError> {
        let chunks = self.collect_from_url(url).await?;
        if chunks.is_empty() {
            tracing::warn!("No text extracted from {}", url);
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = provider.embed(&texts, embedding_model).await?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingProvider(format!(
                "{} embeddings returned for {} chunks of {}",
                embeddings.len(),
                chunks.len(),
                url
            )));
        }

        tracing::debug!("Embedded {} chunks from {}", chunks.len(), url);

        Ok(chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddedDocument {
                embedding,
                text: chunk.text,
                source: chunk.source,
            })
            .collect())
    }

    /// Collect chunks from a URL.
    pub async fn collect_from_url(&self, url: &str) -> Result<Vec<TextChunk>, RagError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RagError::Ingestion(format!("failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(RagError::Ingestion(format!(
                "failed to fetch {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| RagError::Ingestion(format!("failed to read {}: {}", url, e)))?;

        let text = extract_body_text(&html);
        Ok(self.collect_from_text(&text, url))
    }

    /// Collect chunks from text content.
    pub fn collect_from_text(&self, text: &str, source: &str) -> Vec<TextChunk> {
        if self.config.chunk_size == 0 {
            let text = text.trim();
            if text.is_empty() {
                return Vec::new();
            }
            return vec![TextChunk {
                text: text.to_string(),
                source: source.to_string(),
                start_offset: 0,
                chunk_index: 0,
            }];
        }
        self.split_into_chunks(text, source)
    }

    /// Split text into overlapping chunks.
    fn split_into_chunks(&self, text: &str, source: &str) -> Vec<TextChunk> {
        let chunk_size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let max_chunks = self.config.max_chunks_per_source;

        let mut chunks = Vec::new();
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();

        if total_chars == 0 {
            return chunks;
        }

        let mut start = 0;
        let mut chunk_index = 0;

        while start < total_chars && chunks.len() < max_chunks {
            let end = (start + chunk_size).min(total_chars);
            let chunk_text: String = chars[start..end].iter().collect();

            // Try to break at sentence boundary
            let final_text = if end < total_chars {
                find_sentence_boundary(&chunk_text)
            } else {
                chunk_text
            };

            let trimmed = final_text.trim();
            if !trimmed.is_empty() {
                chunks.push(TextChunk {
                    text: trimmed.to_string(),
                    source: source.to_string(),
                    start_offset: start,
                    chunk_index,
                });
                chunk_index += 1;
            }

            if end >= total_chars {
                start = end;
                break;
            }
            // Advance from where the chunk was actually cut, not the nominal window.
            let cut_chars = final_text.chars().count();
            start += cut_chars.saturating_sub(overlap).max(1);
        }

        if start < total_chars && chunks.len() >= max_chunks {
            tracing::warn!(
                source = %source,
                max_chunks_per_source = max_chunks,
                dropped_chars = total_chars - start,
                "Chunk limit reached; rest of the page is not indexed"
            );
        }

        chunks
    }
}

/// Text content of `<body>`, with `<script>` and `<style>` contents dropped
/// and blank lines removed.
pub fn extract_body_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = match Selector::parse("body") {
        Ok(selector) => document
            .select(&selector)
            .next()
            .unwrap_or_else(|| document.root_element()),
        Err(_) => document.root_element(),
    };

    let mut raw = String::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|e| e.name()))
            .map(|name| matches!(name, "script" | "style" | "noscript" | "template"))
            .unwrap_or(false);
        if !hidden {
            raw.push_str(text);
        }
    }

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Find a good sentence boundary within the chunk.
fn find_sentence_boundary(text: &str) -> String {
    let sentence_endings = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

    // Search in the last 20% of the chunk
    let mut search_start = (text.len() * 80) / 100;
    while !text.is_char_boundary(search_start) {
        search_start += 1;
    }
    let search_text = &text[search_start..];

    for ending in sentence_endings.iter() {
        if let Some(pos) = search_text.rfind(ending) {
            let cut_pos = search_start + pos + ending.len();
            return text[..cut_pos].to_string();
        }
    }

    text.to_string()
}
