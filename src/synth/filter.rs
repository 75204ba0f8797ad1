// Filter - High-pass State Variable Filter (Chamberlin)
//
// 2-pole (12dB/octave) high-pass used to turn the click's white-noise burst
// into a bright mechanical "tick".
//
//   high = input - low - q * band
//   band += f * high
//   low  += f * band
//
// with f = 2 * sin(π * fc / Fs) and q = 1 / Q.
// Reference: Hal Chamberlin, "Musical Applications of Microprocessors" (1985).
//
// The Chamberlin structure is only stable up to roughly Fs/6, so the cutoff
// is clamped there.

use std::f32::consts::PI;

/// Cutoff used for the click noise burst
pub const NOISE_HIGHPASS_CUTOFF_HZ: f32 = 2000.0;

/// Resonance used for the click noise burst
pub const NOISE_HIGHPASS_Q: f32 = 1.0;

#[derive(Debug, Clone, Copy)]
pub struct HighPassFilter {
    low: f32,
    band: f32,
    f: f32,
    q: f32,
}

impl HighPassFilter {
    pub fn new(cutoff: f32, resonance: f32, sample_rate: f32) -> Self {
        let max_cutoff = sample_rate / 6.0;
        let safe_cutoff = cutoff.clamp(20.0, max_cutoff.max(20.0));
        let q_factor = resonance.clamp(0.5, 20.0);

        Self {
            low: 0.0,
            band: 0.0,
            f: 2.0 * (PI * safe_cutoff / sample_rate).sin(),
            q: (1.0 / q_factor).clamp(0.01, 2.0),
        }
    }

    /// The 2 kHz, Q=1 high-pass applied to click noise
    pub fn for_click_noise(sample_rate: f32) -> Self {
        Self::new(NOISE_HIGHPASS_CUTOFF_HZ, NOISE_HIGHPASS_Q, sample_rate)
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let high = input - self.low - self.q * self.band;
        self.band += self.f * high;
        self.low += self.f * self.band;
        high
    }

    pub fn reset(&mut self) {
        self.low = 0.0;
        self.band = 0.0;
    }
}
