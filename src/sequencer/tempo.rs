// Tempo - BPM, beats per bar and accent setting
// Values are validated at construction so the scheduler never sees an
// out-of-range tempo or an empty bar.

use super::MetronomeError;
use std::fmt;
use std::time::Duration;

/// Tempo in beats per minute, always within [`Bpm::MIN`, `Bpm::MAX`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bpm(u16);

impl Bpm {
    pub const MIN: u16 = 40;
    pub const MAX: u16 = 200;
    pub const DEFAULT: u16 = 120;

    /// Validated constructor used by the direct numeric entry path.
    /// Out-of-range values are rejected, never clamped.
    pub fn new(bpm: u16) -> Result<Self, MetronomeError> {
        if (Self::MIN..=Self::MAX).contains(&bpm) {
            Ok(Self(bpm))
        } else {
            Err(MetronomeError::TempoOutOfRange {
                bpm: bpm as i64,
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    /// Slider and +/- path: pin the value to the nearest boundary
    pub fn clamped(bpm: i32) -> Self {
        Self(bpm.clamp(Self::MIN as i32, Self::MAX as i32) as u16)
    }

    /// Parse a value typed into the numeric entry dialog.
    ///
    /// Non-numeric input and out-of-range values are both errors; the caller is
    /// expected to keep the current tempo and show it again.
    pub fn parse_entry(input: &str) -> Result<Self, MetronomeError> {
        let trimmed = input.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| MetronomeError::InvalidTempoEntry(trimmed.to_string()))?;

        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u16))
        } else {
            Err(MetronomeError::TempoOutOfRange {
                bpm: value,
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// One BPM faster, pinned at the upper bound
    pub fn incremented(self) -> Self {
        Self::clamped(self.0 as i32 + 1)
    }

    /// One BPM slower, pinned at the lower bound
    pub fn decremented(self) -> Self {
        Self::clamped(self.0 as i32 - 1)
    }

    /// Beat period in milliseconds: 60000 / bpm
    pub fn interval_ms(self) -> f64 {
        60_000.0 / self.0 as f64
    }

    /// Beat period as a `Duration`
    pub fn interval(self) -> Duration {
        Duration::from_secs_f64(60.0 / self.0 as f64)
    }
}

impl Default for Bpm {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl fmt::Display for Bpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.0)
    }
}

/// Number of beats in one bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSignature(u8);

impl TimeSignature {
    pub const MIN_BEATS: u8 = 2;
    pub const MAX_BEATS: u8 = 6;

    pub fn new(beats_per_bar: u8) -> Result<Self, MetronomeError> {
        if (Self::MIN_BEATS..=Self::MAX_BEATS).contains(&beats_per_bar) {
            Ok(Self(beats_per_bar))
        } else {
            Err(MetronomeError::InvalidTimeSignature(beats_per_bar))
        }
    }

    pub fn beats(self) -> u8 {
        self.0
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self(4)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/4", self.0)
    }
}

/// Settings shared by the scheduler and the click generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoState {
    pub bpm: Bpm,
    pub time_signature: TimeSignature,
    pub accent_first_beat: bool,
}

impl TempoState {
    pub fn new(bpm: Bpm, time_signature: TimeSignature, accent_first_beat: bool) -> Self {
        Self {
            bpm,
            time_signature,
            accent_first_beat,
        }
    }

    /// Whether the beat at `beat_index` gets the accented click
    pub fn is_accent(&self, beat_index: u8) -> bool {
        beat_index == 0 && self.accent_first_beat
    }
}

impl Default for TempoState {
    fn default() -> Self {
        Self::new(Bpm::default(), TimeSignature::default(), true)
    }
}
