//! Document index: the persisted set of embedded documents.
//!
//! The file is a flat JSON array of `{embedding, text, source}` records. It is
//! written once by ingestion and only read at query time, so the loaded index
//! is immutable and can be shared across runs without locking.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;
use crate::vector_math::{cosine_similarity, rank_descending_by_cosine};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedDocument {
    pub embedding: Vec<f32>,
    pub text: String,
    /// Source identifier (URL, filename, etc.)
    pub source: String,
}

/// A document paired with its similarity to a query.
#[derive(Debug, Clone, Copy)]
pub struct ScoredDocument<'a> {
    pub document: &'a EmbeddedDocument,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentIndex {
    documents: Vec<EmbeddedDocument>,
}

impl DocumentIndex {
    /// Build an index, checking that every vector has the same dimensionality.
    pub fn from_documents(documents: Vec<EmbeddedDocument>) -> Result<Self, RagError> {
        if let Some(first) = documents.first() {
            let expected = first.embedding.len();
            if expected == 0 {
                return Err(RagError::DegenerateVector(format!(
                    "document `{}` has an empty embedding",
                    first.source
                )));
            }
            if let Some(bad) = documents.iter().find(|d| d.embedding.len() != expected) {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: bad.embedding.len(),
                });
            }
        }

        Ok(Self { documents })
    }

    pub fn load(path: &Path) -> Result<Self, RagError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            RagError::Storage(format!("failed to read index {}: {}", path.display(), e))
        })?;
        let documents: Vec<EmbeddedDocument> = serde_json::from_str(&contents).map_err(|e| {
            RagError::Storage(format!("failed to parse index {}: {}", path.display(), e))
        })?;

        let index = Self::from_documents(documents)?;
        tracing::info!(
            "Loaded {} documents from {} (dimensions: {:?})",
            index.len(),
            path.display(),
            index.dimensions()
        );
        Ok(index)
    }

    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(RagError::storage)?;
            }
        }
        let json = serde_json::to_string(&self.documents).map_err(RagError::storage)?;
        fs::write(path, json).map_err(|e| {
            RagError::Storage(format!("failed to write index {}: {}", path.display(), e))
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.documents.first().map(|d| d.embedding.len())
    }

    /// Linear scan for the most similar document. Ties keep the document that
    /// was inserted first.
    pub fn nearest(&self, query: &[f32]) -> Result<ScoredDocument<'_>, RagError> {
        let mut best: Option<ScoredDocument<'_>> = None;

        for document in &self.documents {
            let score = cosine_similarity(query, &document.embedding)?;
            match best {
                Some(current) if score <= current.score => {}
                _ => best = Some(ScoredDocument { document, score }),
            }
        }

        best.ok_or(RagError::EmptyIndex)
    }

    /// The `k` most similar documents, best first.
    pub fn top_k(&self, query: &[f32], k: usize) -> Result<Vec<ScoredDocument<'_>>, RagError> {
        if self.documents.is_empty() {
            return Err(RagError::EmptyIndex);
        }

        let embeddings: Vec<&[f32]> = self
            .documents
            .iter()
            .map(|document| document.embedding.as_slice())
            .collect();

        Ok(rank_descending_by_cosine(query, &embeddings)?
            .into_iter()
            .take(k)
            .map(|(idx, score)| ScoredDocument {
                document: &self.documents[idx],
                score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(embedding: Vec<f32>, text: &str, source: &str) -> EmbeddedDocument {
        EmbeddedDocument {
            embedding,
            text: text.to_string(),
            source: source.to_string(),
        }
    }

    fn two_doc_index() -> DocumentIndex {
        DocumentIndex::from_documents(vec![
            doc(vec![1.0, 0.0], "A", "u1"),
            doc(vec![0.0, 1.0], "B", "u2"),
        ])
        .unwrap()
    }

    #[test]
    fn nearest_picks_most_similar_document() {
        let index = two_doc_index();
        let hit = index.nearest(&[0.9, 0.1]).unwrap();
        assert_eq!(hit.document.text, "A");
        assert_eq!(hit.document.source, "u1");

        let hit = index.nearest(&[0.1, 0.9]).unwrap();
        assert_eq!(hit.document.source, "u2");
    }

    #[test]
    fn single_document_always_wins() {
        let index = DocumentIndex::from_documents(vec![doc(vec![0.2, 0.7, 0.1], "only", "u")]).unwrap();
        for query in [[1.0, 0.0, 0.0], [-1.0, -1.0, 0.0], [0.0, 0.0, 0.0]] {
            let hit = index.nearest(&query).unwrap();
            assert_eq!(hit.document.text, "only");
        }
    }

    #[test]
    fn nearest_on_empty_index_fails() {
        let index = DocumentIndex::default();
        assert!(matches!(index.nearest(&[1.0]).unwrap_err(), RagError::EmptyIndex));
        assert!(matches!(index.top_k(&[1.0], 3).unwrap_err(), RagError::EmptyIndex));
    }

    #[test]
    fn ties_keep_first_inserted() {
        let index = DocumentIndex::from_documents(vec![
            doc(vec![1.0, 0.0], "first", "u1"),
            doc(vec![2.0, 0.0], "second", "u2"),
        ])
        .unwrap();
        assert_eq!(index.nearest(&[1.0, 0.0]).unwrap().document.text, "first");
    }

    #[test]
    fn negative_similarities_still_return_a_document() {
        let index = two_doc_index();
        let hit = index.nearest(&[-1.0, -0.5]).unwrap();
        assert_eq!(hit.document.text, "B");
        assert!(hit.score < 0.0);
    }

    #[test]
    fn query_dimension_mismatch_fails() {
        let index = two_doc_index();
        let err = index.nearest(&[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { .. }));
    }

    #[test]
    fn inconsistent_documents_are_rejected() {
        let err = DocumentIndex::from_documents(vec![
            doc(vec![1.0, 0.0], "A", "u1"),
            doc(vec![1.0], "B", "u2"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn top_k_orders_and_truncates() {
        let index = DocumentIndex::from_documents(vec![
            doc(vec![0.0, 1.0], "far", "u1"),
            doc(vec![1.0, 0.0], "near", "u2"),
            doc(vec![0.7, 0.7], "middle", "u3"),
        ])
        .unwrap();

        let hits = index.top_k(&[1.0, 0.1], 2).unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.document.text.as_str()).collect();
        assert_eq!(texts, vec!["near", "middle"]);
    }

    #[test]
    fn save_and_load_preserve_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        two_doc_index().save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["text"], "A");
        assert_eq!(raw[0]["source"], "u1");
        assert!(raw[0]["embedding"].is_array());

        let loaded = DocumentIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dimensions(), Some(2));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DocumentIndex::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, RagError::Storage(_)));
    }
}
