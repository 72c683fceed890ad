//! Pseudo-random uniform draw for endpoint selection
//!
//! A 64-bit xorshift generator, seeded once per service start from the wall
//! clock. Not cryptographically secure; the selection algorithm only needs
//! statistical spread across repeated lookups, not unpredictability. The
//! generator is an owned value on the assignment loop, never global state.

use std::time::{SystemTime, UNIX_EPOCH};

const MULTIPLIER: u64 = 2685821657736338717;

/// Scale factor keeping `next_f64` strictly below 1.0, so an index computed
/// as `floor(count * u)` stays within the live range
const SCALE: f64 = 0.999999;

/// Xorshift-multiply generator producing uniform draws in `[0, 1)`
#[derive(Debug, Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Create a generator from an explicit seed. Xorshift state must be
    /// nonzero; a zero seed is bumped to 1.
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.max(1),
        }
    }

    /// Seed from the current Unix time
    pub fn seeded_from_clock() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self::new(secs)
    }

    /// Advance the state and return the raw 64-bit value
    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(MULTIPLIER)
    }

    /// Draw a pseudo-uniform value in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        SCALE * (self.next_u64() as f64) / (u64::MAX as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draws_stay_in_unit_interval() {
        let mut prng = XorShift64::new(0xDEADBEEF);
        for _ in 0..10_000 {
            let u = prng.next_f64();
            assert!((0.0..1.0).contains(&u), "draw out of range: {u}");
        }
    }

    #[test]
    fn test_deterministic_per_seed() {
        let mut a = XorShift64::new(12345);
        let mut b = XorShift64::new(12345);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn test_zero_seed_still_advances() {
        let mut prng = XorShift64::new(0);
        let first = prng.next_u64();
        let second = prng.next_u64();
        assert_ne!(first, second);
        assert_ne!(first, 0);
    }

    #[test]
    fn test_clock_seeded_generator_produces_values() {
        let mut prng = XorShift64::seeded_from_clock();
        let u = prng.next_f64();
        assert!((0.0..1.0).contains(&u));
    }
}
