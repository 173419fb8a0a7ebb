//! Similarity percentage from correspondence counts.

/// `100 * good / max(len_a, len_b, 1)`.
///
/// Returns 0 when either set is empty. The result lies in `[0, 100]` as long
/// as `good` does not exceed the larger set.
pub fn similarity_score(good: usize, len_a: usize, len_b: usize) -> f64 {
    let denom = len_a.max(len_b).max(1);
    let score = 100.0 * good as f64 / denom as f64;
    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::similarity_score;

    #[test]
    fn empty_sets_score_zero() {
        assert_eq!(similarity_score(0, 0, 0), 0.0);
        assert_eq!(similarity_score(0, 10, 0), 0.0);
    }

    #[test]
    fn uses_larger_set_as_denominator() {
        assert!((similarity_score(30, 100, 60) - 30.0).abs() < 1e-12);
        assert!((similarity_score(30, 60, 100) - 30.0).abs() < 1e-12);
        assert_eq!(similarity_score(40, 40, 40), 100.0);
    }
}
