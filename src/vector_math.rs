use std::cmp::Ordering;

use ndarray::ArrayView1;

use crate::core::errors::RagError;

/// Cosine similarity of two equal-length vectors.
///
/// A zero-magnitude vector has no direction, so it scores `0.0` against
/// anything instead of producing `NaN`. Empty vectors are rejected.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, RagError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(RagError::DegenerateVector(
            "vectors must not be empty".to_string(),
        ));
    }
    if query.len() != candidate.len() {
        return Err(RagError::DimensionMismatch {
            expected: query.len(),
            actual: candidate.len(),
        });
    }

    // f64 keeps tiny but non-zero vectors from underflowing to a zero norm.
    let query_view = ArrayView1::from(query).mapv(f64::from);
    let candidate_view = ArrayView1::from(candidate).mapv(f64::from);

    let dot = query_view.dot(&candidate_view);
    let denom = query_view.dot(&query_view).sqrt() * candidate_view.dot(&candidate_view).sqrt();
    if denom == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / denom) as f32)
}

/// Returns `(index, score)` pairs, best first. Equal scores keep their
/// original order.
pub fn rank_descending_by_cosine<C: AsRef<[f32]>>(
    query: &[f32],
    candidates: &[C],
) -> Result<Vec<(usize, f32)>, RagError> {
    let mut scores = Vec::with_capacity(candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        let score = cosine_similarity(query, candidate.as_ref())?;
        scores.push((idx, score));
    }

    scores.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    Ok(scores)
}

/// True only when every component is exactly zero.
pub fn is_zero_vector(vector: &[f32]) -> bool {
    vector.iter().all(|component| *component == 0.0)
}
