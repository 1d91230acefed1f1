//! Cosine similarity and ranking helpers shared by the naive backends.

use loreagent_core::record::SimilarHit;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the vectors differ in length, are empty, or either norm
/// is near zero. Never NaN.
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

/// Score candidate texts against a query embedding and keep hits at or
/// above the threshold, most similar first.
///
/// The threshold is inclusive: a candidate at exactly `threshold` is kept.
pub fn rank_hits<'a, I>(candidates: I, query: &[f32], threshold: f32) -> Vec<SimilarHit>
where
    I: IntoIterator<Item = (&'a str, &'a [f32])>,
{
    let mut hits: Vec<SimilarHit> = candidates
        .into_iter()
        .filter_map(|(text, embedding)| {
            let similarity = cosine_similarity(embedding, query);
            if similarity >= threshold {
                Some(SimilarHit {
                    text: text.to_string(),
                    similarity,
                })
            } else {
                None
            }
        })
        .collect();

    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim - (-1.0)).abs() < 1e-6);
    }

    #[test]
    fn cosine_empty_vectors() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn cosine_mismatched_lengths() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn cosine_zero_vector() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // [1,1] · [1,0] = 1, |[1,1]| = sqrt(2), |[1,0]| = 1
        // similarity = 1 / sqrt(2) ≈ 0.7071
        let a = vec![1.0, 1.0];
        let b = vec![1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn rank_hits_orders_descending() {
        let query = vec![1.0, 0.0, 0.0];
        let a = vec![0.0f32, 1.0, 0.0]; // orthogonal = 0
        let b = vec![1.0f32, 0.0, 0.0]; // identical = 1
        let c = vec![0.5f32, 0.5, 0.0]; // partial ~0.707
        let candidates: Vec<(&str, &[f32])> =
            vec![("a", &a[..]), ("b", &b[..]), ("c", &c[..])];

        let hits = rank_hits(candidates, &query, 0.0);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].text, "b");
        assert_eq!(hits[1].text, "c");
        assert_eq!(hits[2].text, "a");
    }

    #[test]
    fn rank_hits_threshold_is_inclusive() {
        let query = vec![1.0, 0.0];
        let exact = vec![1.0f32, 0.0];
        let below = vec![0.0f32, 1.0];
        let candidates: Vec<(&str, &[f32])> = vec![("exact", &exact[..]), ("below", &below[..])];

        let hits = rank_hits(candidates, &query, 1.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "exact");
    }
}
