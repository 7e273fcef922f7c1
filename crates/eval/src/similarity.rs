//! Cosine similarity ranking

use std::cmp::Ordering;

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero norm or the dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Rank candidate documents against a query embedding.
///
/// Documents without an embedding (skipped at embed time) are excluded from
/// the ranking. Ordering is deterministic: descending score, NaN scores last,
/// ties broken by ascending document id.
pub fn rank_candidates(
    query_embedding: &[f32],
    documents: &[(String, Option<Vec<f32>>)],
    depth: usize,
) -> Vec<(String, f32)> {
    let mut scored: Vec<(String, f32)> = documents
        .iter()
        .filter_map(|(id, embedding)| {
            embedding
                .as_ref()
                .map(|e| (id.clone(), cosine_similarity(query_embedding, e)))
        })
        .collect();

    scored.sort_by(|a, b| {
        let a_is_nan = a.1.is_nan();
        let b_is_nan = b.1.is_nan();
        match (a_is_nan, b_is_nan) {
            (true, true) => a.0.cmp(&b.0),
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => b
                .1
                .partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0)),
        }
    });

    scored.truncate(depth);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![0.6, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_norm() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_dimension_mismatch() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_candidates_orders_by_score() {
        let query = vec![1.0, 0.0];
        let docs = vec![
            ("far".to_string(), Some(vec![0.0, 1.0])),
            ("near".to_string(), Some(vec![0.9, 0.1])),
            ("exact".to_string(), Some(vec![1.0, 0.0])),
        ];
        let ranked = rank_candidates(&query, &docs, 10);
        let ids: Vec<&str> = ranked.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near", "far"]);
    }

    #[test]
    fn test_rank_candidates_ties_broken_by_id() {
        let query = vec![1.0, 0.0];
        let docs = vec![
            ("b".to_string(), Some(vec![1.0, 0.0])),
            ("a".to_string(), Some(vec![1.0, 0.0])),
            ("c".to_string(), Some(vec![1.0, 0.0])),
        ];
        let ranked = rank_candidates(&query, &docs, 10);
        let ids: Vec<&str> = ranked.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rank_candidates_skips_missing_embeddings() {
        let query = vec![1.0, 0.0];
        let docs = vec![
            ("kept".to_string(), Some(vec![1.0, 0.0])),
            ("skipped".to_string(), None),
        ];
        let ranked = rank_candidates(&query, &docs, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0, "kept");
    }

    #[test]
    fn test_rank_candidates_truncates_to_depth() {
        let query = vec![1.0];
        let docs: Vec<(String, Option<Vec<f32>>)> = (0..10)
            .map(|i| (format!("d{i}"), Some(vec![1.0 - i as f32 * 0.05])))
            .collect();
        let ranked = rank_candidates(&query, &docs, 3);
        assert_eq!(ranked.len(), 3);
    }
}
