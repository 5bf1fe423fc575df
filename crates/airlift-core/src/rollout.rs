//! Percentage rollout gating.
//!
//! A device is bucketed deterministically from its fingerprint so the same
//! device gets the same answer across polls and server restarts. Requests
//! without a fingerprint fall back to a process-wide seeded generator.

use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic bucket for a fingerprint: byte sum modulo 100.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn bucket_for(fingerprint: &str) -> u8 {
    let sum: u64 = fingerprint.bytes().map(u64::from).sum();
    (sum % 100) as u8
}

/// Process-wide rollout selector.
///
/// Holds the fallback generator behind a mutex; the deterministic path never
/// touches it.
pub struct RolloutSelector {
    rng: Mutex<StdRng>,
}

impl RolloutSelector {
    /// Seed the fallback generator once from wall-clock time.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_nanos() as u64);
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Whether a device with `fingerprint` receives an update gated at
    /// `percentage`. Values at or beyond the 0/100 bounds short-circuit.
    pub fn should_serve(&self, percentage: i64, fingerprint: &str) -> bool {
        if percentage >= 100 {
            return true;
        }
        if percentage <= 0 {
            return false;
        }
        if fingerprint.is_empty() {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            i64::from(rng.gen_range(0..100u8)) < percentage
        } else {
            i64::from(bucket_for(fingerprint)) < percentage
        }
    }
}

impl Default for RolloutSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_short_circuit() {
        let selector = RolloutSelector::new();
        assert!(selector.should_serve(100, ""));
        assert!(selector.should_serve(250, "any-device"));
        assert!(!selector.should_serve(0, "any-device"));
        assert!(!selector.should_serve(-5, ""));
    }

    #[test]
    fn fingerprint_answer_is_deterministic() {
        let selector = RolloutSelector::new();
        for percentage in [1, 25, 50, 99] {
            let first = selector.should_serve(percentage, "device-abc-123");
            for _ in 0..50 {
                assert_eq!(selector.should_serve(percentage, "device-abc-123"), first);
            }
        }
    }

    #[test]
    fn equal_byte_sums_bucket_together() {
        // "ab" and "ba" share a byte sum, so they share a bucket.
        assert_eq!(bucket_for("ab"), bucket_for("ba"));
        let selector = RolloutSelector::new();
        for percentage in 1..100 {
            assert_eq!(
                selector.should_serve(percentage, "ab"),
                selector.should_serve(percentage, "ba")
            );
        }
    }

    #[test]
    fn serving_is_monotonic_in_percentage() {
        let selector = RolloutSelector::new();
        let fingerprint = "f81d4fae-7dec-11d0-a765-00a0c91e6bf6";
        let mut served = false;
        for percentage in 0..=100 {
            let now = selector.should_serve(percentage, fingerprint);
            assert!(now || !served, "serving regressed at {percentage}");
            served = now;
        }
        assert!(served);
    }

    #[test]
    fn bucket_is_bounded() {
        for fingerprint in ["", "a", "device", "\u{00ff}\u{00ff}\u{00ff}"] {
            assert!(bucket_for(fingerprint) < 100);
        }
    }
}
