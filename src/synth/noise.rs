// White noise burst for the click transient

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Length of the noise burst in milliseconds
pub const NOISE_BURST_MS: f32 = 20.0;

/// Finite run of independent uniform samples in [-1, 1].
///
/// Each click gets its own seed, so every burst is fresh noise while the
/// generator itself stays allocation-free.
#[derive(Debug, Clone)]
pub struct NoiseBurst {
    rng: StdRng,
    remaining: usize,
}

impl NoiseBurst {
    pub fn new(seed: u64, length: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            remaining: length,
        }
    }

    /// Number of samples in a burst of `duration_ms` at `sample_rate`
    pub fn length_for(duration_ms: f32, sample_rate: f32) -> usize {
        (sample_rate * duration_ms / 1000.0) as usize
    }

    /// Next sample, or silence once the burst has run out
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if self.remaining == 0 {
            return 0.0;
        }
        self.remaining -= 1;
        self.rng.gen_range(-1.0..=1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }
}
