//! xorshift64* random number generator
//!
//! xorshift64* passes TestU01's BigCrush with 64-bit state, which is plenty
//! for one Bernoulli draw per round.
//!
//! # Determinism
//!
//! Same seed → same sequence of draws. Sessions are therefore reproducible
//! from `(session seed, participant id)` when debugging or testing, while
//! different participants still get unrelated streams.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use portfolio_experiment_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let value = rng.next();
/// let allocation = rng.range(0, 101); // [0, 101)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit, never zero)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// A zero seed is mapped to 1 (xorshift requirement).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Create the stream for one participant of a session
    ///
    /// The seed is the first 8 bytes of SHA-256(`session_seed` ‖ `participant_id`),
    /// so two participants never share a stream even when their ids differ
    /// by a single character.
    ///
    /// # Example
    /// ```
    /// use portfolio_experiment_core_rs::RngManager;
    ///
    /// let a = RngManager::for_participant(7, "P001");
    /// let b = RngManager::for_participant(7, "P002");
    /// assert_ne!(a.get_state(), b.get_state());
    /// assert_eq!(a, RngManager::for_participant(7, "P001"));
    /// ```
    pub fn for_participant(session_seed: u64, participant_id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(session_seed.to_le_bytes());
        hasher.update(participant_id.as_bytes());
        let digest = hasher.finalize();

        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&digest[..8]);
        Self::new(u64::from_le_bytes(seed_bytes))
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Generate random value in range [min, max)
    ///
    /// # Panics
    /// Panics if min >= max
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        assert!(min < max, "min must be less than max");

        let value = self.next();
        let range_size = (max - min) as u64;
        min + (value % range_size) as i64
    }

    /// Get current RNG state (for checkpointing)
    ///
    /// `RngManager::new(rng.get_state())` resumes the exact same sequence.
    pub fn get_state(&self) -> u64 {
        self.state
    }

    /// Generate random f64 in range [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        // Top 53 bits → [0.0, 1.0)
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }
}
