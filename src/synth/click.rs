// Click synthesis - the mechanical metronome "tick"
//
// One click = two tones plus a filtered noise transient:
//
//   primary square  (f)  ─┐
//   harmonic triangle (2f) ─┴─ × tone envelope ──────────────┐
//   white noise 20ms ── × noise envelope ── high-pass 2kHz ──┴─ Σ ── × master volume
//
// Tone envelope: 0 → sustain (linear, 5ms) → 0.3·sustain (exp, 30ms)
//                → 0.001 (exp, release)
// Noise envelope: 0 → noise level (linear, 2ms) → 0.001 (exp, by 15ms),
//                 source stops at 20ms
//
// Accented clicks only differ by frequency, levels and release length.

use super::envelope::RampEnvelope;
use super::filter::HighPassFilter;
use super::noise::{NOISE_BURST_MS, NoiseBurst};
use super::oscillator::{Oscillator, SimpleOscillator, WaveformType};
use crate::audio::dsp_utils::{OnePoleSmoother, flush_denormals_to_zero};

pub const ACCENT_FREQUENCY_HZ: f32 = 1200.0;
pub const REGULAR_FREQUENCY_HZ: f32 = 800.0;

pub const ACCENT_SUSTAIN_LEVEL: f32 = 0.4;
pub const REGULAR_SUSTAIN_LEVEL: f32 = 0.25;

pub const ACCENT_NOISE_LEVEL: f32 = 0.15;
pub const REGULAR_NOISE_LEVEL: f32 = 0.08;

pub const ACCENT_RELEASE_MS: f32 = 80.0;
pub const REGULAR_RELEASE_MS: f32 = 50.0;

pub const ATTACK_MS: f32 = 5.0;
pub const DECAY_MS: f32 = 30.0;
/// Decay target as a fraction of the sustain level
pub const DECAY_RATIO: f32 = 0.3;
/// Level exponential ramps head for; exponential curves cannot reach zero
pub const SILENCE_LEVEL: f32 = 0.001;

pub const NOISE_ATTACK_MS: f32 = 2.0;
/// Time after trigger at which the noise envelope reaches [`SILENCE_LEVEL`]
pub const NOISE_DECAY_END_MS: f32 = 15.0;

/// Shape of one click, derived from the accent flag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickSpec {
    pub base_frequency: f32,
    pub sustain_level: f32,
    pub noise_level: f32,
    pub attack_ms: f32,
    pub decay_ms: f32,
    pub release_ms: f32,
    pub noise_attack_ms: f32,
    pub noise_decay_end_ms: f32,
    pub noise_duration_ms: f32,
    pub is_accent: bool,
}

impl ClickSpec {
    pub fn for_beat(is_accent: bool) -> Self {
        let (base_frequency, sustain_level, noise_level, release_ms) = if is_accent {
            (
                ACCENT_FREQUENCY_HZ,
                ACCENT_SUSTAIN_LEVEL,
                ACCENT_NOISE_LEVEL,
                ACCENT_RELEASE_MS,
            )
        } else {
            (
                REGULAR_FREQUENCY_HZ,
                REGULAR_SUSTAIN_LEVEL,
                REGULAR_NOISE_LEVEL,
                REGULAR_RELEASE_MS,
            )
        };

        Self {
            base_frequency,
            sustain_level,
            noise_level,
            attack_ms: ATTACK_MS,
            decay_ms: DECAY_MS,
            release_ms,
            noise_attack_ms: NOISE_ATTACK_MS,
            noise_decay_end_ms: NOISE_DECAY_END_MS,
            noise_duration_ms: NOISE_BURST_MS,
            is_accent,
        }
    }

    /// Frequency of the secondary tone, one octave above the base
    pub fn harmonic_frequency(&self) -> f32 {
        self.base_frequency * 2.0
    }

    /// Attack + decay + release
    pub fn tone_duration_ms(&self) -> f32 {
        self.attack_ms + self.decay_ms + self.release_ms
    }

    /// Time until every component of the click has stopped
    pub fn duration_ms(&self) -> f32 {
        self.tone_duration_ms().max(self.noise_duration_ms)
    }

    pub fn tone_envelope(&self) -> RampEnvelope {
        let attack_end = self.attack_ms / 1000.0;
        let decay_end = attack_end + self.decay_ms / 1000.0;
        let release_end = decay_end + self.release_ms / 1000.0;

        RampEnvelope::new(0.0)
            .linear_to(self.sustain_level, attack_end)
            .exponential_to(self.sustain_level * DECAY_RATIO, decay_end)
            .exponential_to(SILENCE_LEVEL, release_end)
    }

    pub fn noise_envelope(&self) -> RampEnvelope {
        RampEnvelope::new(0.0)
            .linear_to(self.noise_level, self.noise_attack_ms / 1000.0)
            .exponential_to(SILENCE_LEVEL, self.noise_decay_end_ms / 1000.0)
    }
}

/// Render request sent to the audio output for one beat
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickRequest {
    pub spec: ClickSpec,
    /// Master volume at the time of the request, in [0, 1]
    pub master_volume: f32,
    /// Seed for this click's noise burst
    pub noise_seed: u64,
}

impl ClickRequest {
    pub fn new(is_accent: bool, master_volume: f32, noise_seed: u64) -> Self {
        Self {
            spec: ClickSpec::for_beat(is_accent),
            master_volume: master_volume.clamp(0.0, 1.0),
            noise_seed,
        }
    }

    pub fn is_accent(&self) -> bool {
        self.spec.is_accent
    }
}

/// One sounding click. Lives until its last component has finished, then
/// the synthesizer frees its slot.
#[derive(Debug, Clone)]
pub struct ClickVoice {
    spec: ClickSpec,
    primary: SimpleOscillator,
    harmonic: SimpleOscillator,
    tone_envelope: RampEnvelope,
    noise_envelope: RampEnvelope,
    noise: NoiseBurst,
    highpass: HighPassFilter,
    sample_rate: f32,
    position: usize,
    tone_samples: usize,
    total_samples: usize,
}

impl ClickVoice {
    pub fn new(request: &ClickRequest, sample_rate: f32) -> Self {
        let spec = request.spec;
        let tone_samples = samples_for(spec.tone_duration_ms(), sample_rate);
        let noise_samples = NoiseBurst::length_for(spec.noise_duration_ms, sample_rate);

        Self {
            spec,
            primary: SimpleOscillator::with_frequency(
                WaveformType::Square,
                spec.base_frequency,
                sample_rate,
            ),
            harmonic: SimpleOscillator::with_frequency(
                WaveformType::Triangle,
                spec.harmonic_frequency(),
                sample_rate,
            ),
            tone_envelope: spec.tone_envelope(),
            noise_envelope: spec.noise_envelope(),
            noise: NoiseBurst::new(request.noise_seed, noise_samples),
            highpass: HighPassFilter::for_click_noise(sample_rate),
            sample_rate,
            position: 0,
            tone_samples,
            total_samples: tone_samples.max(noise_samples),
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if self.is_finished() {
            return 0.0;
        }

        let t = self.position as f32 / self.sample_rate;

        let tone = if self.position < self.tone_samples {
            let raw = self.primary.next_sample() + self.harmonic.next_sample();
            raw * self.tone_envelope.value_at(t)
        } else {
            0.0
        };

        let noise_in = self.noise.next_sample() * self.noise_envelope.value_at(t);
        let noise = self.highpass.process(noise_in);

        self.position += 1;
        flush_denormals_to_zero(tone + noise)
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.total_samples
    }

    pub fn is_accent(&self) -> bool {
        self.spec.is_accent
    }

    pub fn spec(&self) -> &ClickSpec {
        &self.spec
    }

    /// Samples rendered so far
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn total_samples(&self) -> usize {
        self.total_samples
    }
}

fn samples_for(duration_ms: f32, sample_rate: f32) -> usize {
    (duration_ms / 1000.0 * sample_rate).round() as usize
}

/// Mixes overlapping clicks into one stream behind a shared master volume.
///
/// Voice slots are allocated once up front; starting a click only fills a
/// slot, so `play` is safe to call from the audio callback. When every slot
/// is busy the oldest click is replaced.
pub struct ClickSynthesizer {
    sample_rate: f32,
    voices: Vec<Option<ClickVoice>>,
    master_volume: f32,
    volume_smoother: OnePoleSmoother,
}

impl ClickSynthesizer {
    pub const DEFAULT_VOICES: usize = 8;

    pub fn new(
        sample_rate: f32,
        voice_capacity: usize,
        initial_volume: f32,
        volume_smoothing_ms: f32,
    ) -> Self {
        let initial_volume = initial_volume.clamp(0.0, 1.0);
        Self {
            sample_rate,
            voices: vec![None; voice_capacity.max(1)],
            master_volume: initial_volume,
            volume_smoother: OnePoleSmoother::new(
                initial_volume,
                volume_smoothing_ms,
                sample_rate,
            ),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Volume applied downstream of every voice, including clicks still sounding.
    /// Non-finite values are ignored so the smoother state stays valid.
    pub fn set_master_volume(&mut self, volume: f32) {
        if volume.is_finite() {
            self.master_volume = volume.clamp(0.0, 1.0);
        }
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Start one click
    pub fn play(&mut self, request: ClickRequest) {
        self.set_master_volume(request.master_volume);
        let voice = ClickVoice::new(&request, self.sample_rate);

        let slot = match self.voices.iter().position(Option::is_none) {
            Some(free) => free,
            None => self
                .voices
                .iter()
                .enumerate()
                .max_by_key(|(_, voice)| voice.as_ref().map_or(0, ClickVoice::position))
                .map_or(0, |(index, _)| index),
        };
        self.voices[slot] = Some(voice);
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let mut mix = 0.0;
        for slot in self.voices.iter_mut() {
            if let Some(voice) = slot {
                mix += voice.next_sample();
                if voice.is_finished() {
                    *slot = None;
                }
            }
        }

        let volume = self.volume_smoother.process(self.master_volume);
        flush_denormals_to_zero(mix * volume)
    }

    /// Fill `output` with mono samples
    pub fn render(&mut self, output: &mut [f32]) {
        for sample in output.iter_mut() {
            *sample = self.next_sample();
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|voice| voice.is_some()).count()
    }

    pub fn voice_capacity(&self) -> usize {
        self.voices.len()
    }
}
