//! Exact hypergeometric helpers. Every pool in play is at most 52 numbers,
//! so plain f64 products are exact enough (C(52, 6) ≈ 2.0e7).

/// Binomial coefficient C(n, k) as f64. Zero when k > n.
pub fn choose(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut result = 1.0f64;
    for i in 0..k {
        result = result * (n - i) as f64 / (i + 1) as f64;
    }
    result
}

/// Probability that a uniform draw of `picks` numbers from a pool of `total`
/// hits at least `min_matches` of a `marked` subset.
pub fn tail_at_least(total: usize, marked: usize, picks: usize, min_matches: usize) -> f64 {
    if total == 0 || picks == 0 {
        return if min_matches == 0 { 1.0 } else { 0.0 };
    }
    let marked = marked.min(total);
    let denominator = choose(total, picks);
    if denominator <= 0.0 {
        return 0.0;
    }
    let upper = picks.min(marked);
    let mut probability = 0.0f64;
    for k in min_matches..=upper {
        if picks - k > total - marked {
            continue;
        }
        probability += choose(marked, k) * choose(total - marked, picks - k) / denominator;
    }
    probability.min(1.0)
}

/// Expected overlap between the drawn numbers and a marked subset.
pub fn expected_matches(total: usize, marked: usize, picks: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    picks as f64 * marked as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_known_values() {
        assert_eq!(choose(52, 6), 20_358_520.0);
        assert_eq!(choose(5, 0), 1.0);
        assert_eq!(choose(5, 5), 1.0);
        assert_eq!(choose(4, 6), 0.0);
        assert_eq!(choose(6, 3), 20.0);
    }

    #[test]
    fn test_tail_full_pool_is_certain() {
        // Every drawn number is marked, so any threshold up to `picks` holds.
        assert!((tail_at_least(52, 52, 6, 3) - 1.0).abs() < 1e-12);
        assert!((tail_at_least(36, 36, 5, 5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tail_zero_threshold_is_certain() {
        assert!((tail_at_least(52, 10, 6, 0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tail_monotone_in_pool_size() {
        let mut previous = 0.0;
        for marked in [10, 15, 20, 25, 30] {
            let p = tail_at_least(52, marked, 6, 3);
            assert!(p >= previous, "coverage dropped at pool size {}", marked);
            assert!(p >= 0.0 && p <= 1.0);
            previous = p;
        }
    }

    #[test]
    fn test_tail_hand_computed() {
        // Draw 2 from 5 with 3 marked: P(both marked) = C(3,2)/C(5,2) = 0.3.
        assert!((tail_at_least(5, 3, 2, 2) - 0.3).abs() < 1e-12);
        // P(at least one) = 1 - C(2,2)/C(5,2) = 0.9.
        assert!((tail_at_least(5, 3, 2, 1) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_expected_matches() {
        assert!((expected_matches(52, 26, 6) - 3.0).abs() < 1e-12);
        assert!((expected_matches(36, 36, 5) - 5.0).abs() < 1e-12);
    }
}
