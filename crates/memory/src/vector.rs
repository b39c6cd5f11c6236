//! Vector similarity utilities.
//!
//! Pure-Rust cosine similarity and brute-force top-k ranking, shared by the
//! in-memory and SQLite vector stores.

use concierge_core::memory::{MemoryMatch, MemoryRecord};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length, empty, or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank records by cosine similarity to `query`, highest first, keeping `top_k`.
///
/// Ties keep insertion order (the sort is stable).
pub fn rank_by_similarity<'a>(
    records: impl IntoIterator<Item = &'a MemoryRecord>,
    query: &[f32],
    top_k: usize,
) -> Vec<MemoryMatch> {
    let mut scored: Vec<MemoryMatch> = records
        .into_iter()
        .map(|r| MemoryMatch {
            text: r.text.clone(),
            score: cosine_similarity(&r.vector, query),
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str, vector: Vec<f32>) -> MemoryRecord {
        MemoryRecord {
            id: format!("id-{text}"),
            vector,
            owner_id: "u1".into(),
            text: text.into(),
        }
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // [1,1] · [1,0] = 1, |[1,1]| = sqrt(2), |[1,0]| = 1
        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn ranks_descending() {
        let records = vec![
            record("orthogonal", vec![0.0, 1.0, 0.0]),
            record("identical", vec![1.0, 0.0, 0.0]),
            record("partial", vec![0.5, 0.5, 0.0]),
        ];
        let ranked = rank_by_similarity(&records, &[1.0, 0.0, 0.0], 10);
        let texts: Vec<&str> = ranked.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["identical", "partial", "orthogonal"]);
        assert!(ranked[0].score >= ranked[1].score);
    }

    #[test]
    fn respects_top_k() {
        let records: Vec<_> = (0..10)
            .map(|i| record(&format!("r{i}"), vec![1.0, i as f32 * 0.1]))
            .collect();
        assert_eq!(rank_by_similarity(&records, &[1.0, 0.0], 4).len(), 4);
    }

    #[test]
    fn empty_store_ranks_nothing() {
        let empty: Vec<MemoryRecord> = Vec::new();
        assert!(rank_by_similarity(&empty, &[1.0], 4).is_empty());
    }
}
