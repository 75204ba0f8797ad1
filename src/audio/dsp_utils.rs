// Utilitaires DSP - output hygiene and parameter smoothing for the audio callback

/// Values below this magnitude are treated as silence
const DENORMAL_THRESHOLD: f32 = 1e-15;

/// Force near-zero values to exactly zero.
///
/// Long exponential tails drift into denormal territory, which is very slow on
/// some CPUs.
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < DENORMAL_THRESHOLD { 0.0 } else { x }
}

/// tanh saturation: transparent near zero, asymptotic to ±1
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

/// One-pole smoother for control values (master volume).
///
/// `y[n] = y[n-1] + α * (x[n] - y[n-1])`, with α = 1 / (τ · Fs).
#[derive(Debug, Clone, Copy)]
pub struct OnePoleSmoother {
    current: f32,
    coefficient: f32,
}

impl OnePoleSmoother {
    /// `time_constant_ms` is the time to cover ~63% of a step.
    /// A zero time constant disables smoothing.
    ///
    /// ```
    /// use click_metronome::audio::dsp_utils::OnePoleSmoother;
    /// let mut volume = OnePoleSmoother::new(0.7, 10.0, 48000.0);
    /// assert!(volume.process(0.0) < 0.7);
    /// ```
    pub fn new(initial_value: f32, time_constant_ms: f32, sample_rate: f32) -> Self {
        let time_constant_samples = time_constant_ms * 0.001 * sample_rate;
        let coefficient = if time_constant_samples > 1.0 {
            1.0 / time_constant_samples
        } else {
            1.0
        };

        Self {
            current: initial_value,
            coefficient,
        }
    }

    #[inline]
    pub fn process(&mut self, target: f32) -> f32 {
        self.current += self.coefficient * (target - self.current);
        self.current = flush_denormals_to_zero(self.current);
        self.current
    }

    /// Jump to `value` without smoothing
    #[inline]
    pub fn reset(&mut self, value: f32) {
        self.current = value;
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_denormals() {
        assert_eq!(flush_denormals_to_zero(1e-20), 0.0);
        assert_eq!(flush_denormals_to_zero(0.001), 0.001);
        assert_eq!(flush_denormals_to_zero(-0.25), -0.25);
    }

    #[test]
    fn test_soft_clip_bounds() {
        assert!(soft_clip(0.0).abs() < 1e-6);
        assert!(soft_clip(8.0) <= 1.0);
        assert!(soft_clip(-8.0) >= -1.0);
        assert!((soft_clip(0.1) - 0.1).abs() < 0.001);
    }

    #[test]
    fn test_smoother_converges_without_overshoot() {
        let mut smoother = OnePoleSmoother::new(0.0, 10.0, 48000.0);
        let mut value = 0.0;
        for _ in 0..4800 {
            value = smoother.process(1.0);
            assert!((0.0..=1.0).contains(&value));
        }
        assert!((value - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_smoother_reaches_exact_zero() {
        let mut smoother = OnePoleSmoother::new(0.7, 10.0, 48000.0);
        for _ in 0..48000 {
            smoother.process(0.0);
        }
        assert_eq!(smoother.get(), 0.0);
    }

    #[test]
    fn test_zero_time_constant_is_immediate() {
        let mut smoother = OnePoleSmoother::new(0.7, 0.0, 48000.0);
        assert!((smoother.process(0.2) - 0.2).abs() < 1e-6);
        smoother.reset(0.9);
        assert_eq!(smoother.get(), 0.9);
    }
}
