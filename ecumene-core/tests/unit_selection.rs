//! Unit tests for the random-selection math
//!
//! The index draw mirrors the store-side script: `floor(count * u)` over
//! the live, score-ascending range, with `u` in `[0, 1)`.

use ecumene_core::prng::XorShift64;

/// Same index computation the lookup script performs
fn selection_index(count: u64, u: f64) -> u64 {
    (count as f64 * u).floor() as u64
}

#[test]
fn test_index_stays_within_live_range() {
    let mut prng = XorShift64::new(42);
    for count in [1u64, 2, 3, 7, 100, 10_000] {
        for _ in 0..1_000 {
            let idx = selection_index(count, prng.next_f64());
            assert!(idx < count, "index {idx} out of range for count {count}");
        }
    }
}

#[test]
fn test_empty_live_range_selects_index_zero() {
    let mut prng = XorShift64::new(42);
    // A fetch at index 0 over an empty range returns nothing; the reply
    // becomes status unavailable.
    assert_eq!(selection_index(0, prng.next_f64()), 0);
}

#[test]
fn test_selection_is_approximately_uniform() {
    const ENDPOINTS: usize = 5;
    const TRIALS: usize = 10_000;

    let mut prng = XorShift64::new(0xC0FFEE);
    let mut observed = [0u64; ENDPOINTS];
    for _ in 0..TRIALS {
        let idx = selection_index(ENDPOINTS as u64, prng.next_f64());
        observed[idx as usize] += 1;
    }

    // Chi-square goodness of fit against the uniform expectation. The
    // 0.999 critical value for 4 degrees of freedom is 18.47; the seed is
    // fixed, so this is deterministic.
    let expected = (TRIALS / ENDPOINTS) as f64;
    let chi_square: f64 = observed
        .iter()
        .map(|&o| {
            let diff = o as f64 - expected;
            diff * diff / expected
        })
        .sum();
    assert!(
        chi_square < 18.47,
        "selection skewed: chi-square {chi_square}, counts {observed:?}"
    );

    for (i, &count) in observed.iter().enumerate() {
        assert!(count > 0, "endpoint {i} never selected");
    }
}

#[test]
fn test_two_generators_with_different_seeds_diverge() {
    let mut a = XorShift64::new(1);
    let mut b = XorShift64::new(2);
    let diverged = (0..16).any(|_| a.next_u64() != b.next_u64());
    assert!(diverged);
}

#[test]
fn test_draw_never_reaches_one() {
    // The scale factor keeps u strictly below 1.0 so floor(count * u) can
    // never equal count.
    let mut prng = XorShift64::new(u64::MAX);
    for _ in 0..100_000 {
        assert!(prng.next_f64() < 1.0);
    }
}
