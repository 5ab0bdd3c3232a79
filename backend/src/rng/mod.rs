//! Deterministic random number generation
//!
//! Uses xorshift64* algorithm for fast, deterministic random number generation.
//! CRITICAL: Regime draws MUST go through a [`RandomSource`]; nothing in the
//! crate reads ambient randomness.

mod xorshift;

pub use xorshift::RngManager;

use crate::core::Bps;

/// Source of uniform randomness injected into outcome draws
///
/// A single operation: one Bernoulli trial with the given success
/// probability (basis points, 0..=10_000).
pub trait RandomSource {
    fn bernoulli(&mut self, probability: Bps) -> bool;
}

impl RandomSource for RngManager {
    fn bernoulli(&mut self, probability: Bps) -> bool {
        self.next_f64() < probability.as_fraction()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn bernoulli(&mut self, probability: Bps) -> bool {
        (**self).bernoulli(probability)
    }
}
