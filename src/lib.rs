// Click Metronome - Library exports for the binary, tests and benchmarks

pub mod audio;
pub mod config;
pub mod messaging;
pub mod sequencer;
pub mod synth;

// Re-export commonly used types for convenience
pub use audio::{AudioEngine, AudioError, ClickSink, NullSink};
pub use config::{ConfigError, MetronomeConfig};
pub use messaging::channels::{
    create_control_channel, create_display_channel, create_notification_channel,
};
pub use messaging::command::ControlCommand;
pub use messaging::display::{BeatEvent, DisplayEvent};
pub use sequencer::metronome::MetronomeSnapshot;
pub use sequencer::{
    Bpm, Clock, ManualClock, Metronome, MetronomeError, MonotonicClock, TapTempoEstimator,
    TempoState, TimeSignature,
};
pub use synth::click::{ClickRequest, ClickSpec, ClickSynthesizer};
