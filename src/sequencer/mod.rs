// Sequencer module - Beat scheduling, tempo state and tap tempo
// Everything here runs on a single control thread; the audio thread only
// receives fire-and-forget click requests.

pub mod clock;
pub mod metronome;
pub mod tap_tempo;
pub mod tempo;
pub mod timer;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use metronome::Metronome;
pub use tap_tempo::TapTempoEstimator;
pub use tempo::{Bpm, TempoState, TimeSignature};
pub use timer::{TimerId, TimerQueue, TimerTask};

use thiserror::Error;

/// Errors reported to callers of the metronome control surface
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetronomeError {
    #[error("Tempo {bpm} BPM is outside the accepted range {min}-{max}")]
    TempoOutOfRange { bpm: i64, min: u16, max: u16 },

    #[error("Invalid tempo entry: {0:?}")]
    InvalidTempoEntry(String),

    #[error("Invalid time signature: {0} beats per bar (expected {min}-{max})", min = TimeSignature::MIN_BEATS, max = TimeSignature::MAX_BEATS)]
    InvalidTimeSignature(u8),
}
