// Oscillators - Naive square and triangle tone generators

pub trait Oscillator {
    fn next_sample(&mut self) -> f32;
    fn set_frequency(&mut self, freq: f32);
    fn reset(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaveformType {
    /// Hard edges, gives the click its sharp onset
    Square,
    /// Softer harmonic layer
    Triangle,
}

#[derive(Debug, Clone)]
pub struct SimpleOscillator {
    waveform: WaveformType,
    phase: f32,
    phase_increment: f32,
    sample_rate: f32,
}

impl SimpleOscillator {
    pub fn new(waveform: WaveformType, sample_rate: f32) -> Self {
        Self {
            waveform,
            phase: 0.0,
            phase_increment: 0.0,
            sample_rate,
        }
    }

    /// Convenience constructor with the frequency already set
    pub fn with_frequency(waveform: WaveformType, frequency: f32, sample_rate: f32) -> Self {
        let mut osc = Self::new(waveform, sample_rate);
        osc.set_frequency(frequency);
        osc
    }

    pub fn waveform(&self) -> WaveformType {
        self.waveform
    }
}

impl Oscillator for SimpleOscillator {
    fn next_sample(&mut self) -> f32 {
        let sample = match self.waveform {
            WaveformType::Square => {
                if self.phase < 0.5 { 1.0 } else { -1.0 }
            }
            WaveformType::Triangle => {
                if self.phase < 0.5 {
                    self.phase * 4.0 - 1.0
                } else {
                    3.0 - self.phase * 4.0
                }
            }
        };

        self.phase += self.phase_increment;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        sample
    }

    fn set_frequency(&mut self, freq: f32) {
        let increment = freq / self.sample_rate;
        // Keep the phase accumulator sane for nonsense input
        self.phase_increment = if increment.is_finite() {
            increment.clamp(0.0, 0.5)
        } else {
            0.0
        };
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}
