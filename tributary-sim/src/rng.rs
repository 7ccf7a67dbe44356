//! Seeded random generation for reproducible stress runs.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic random number generator for the stress harness.
///
/// Uses the ChaCha8 algorithm: fast, high-quality pseudorandom numbers
/// fully determined by the seed.
#[derive(Debug)]
pub struct StressRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl StressRng {
    /// Creates a generator from a seed value.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Returns the seed this generator was built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generates a random number in `[0, 1)`.
    pub fn random_f64(&mut self) -> f64 {
        self.rng.next_u64() as f64 / u64::MAX as f64
    }

    /// Returns `true` with the given probability.
    pub fn random_bool(&mut self, probability: f64) -> bool {
        self.random_f64() < probability
    }

    /// Generates a random number in `[0, bound)`; zero when `bound` is zero.
    pub fn random_below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        (self.rng.next_u64() % u64::from(bound)) as u32
    }

    /// Generates a random index into a collection of `len` elements.
    pub fn random_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.rng.next_u64() % len as u64) as usize
    }
}
