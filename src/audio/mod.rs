// Audio module - CPAL backend and real-time callback

pub mod device;
pub mod dsp_utils;
pub mod engine;
pub mod shared;
pub mod sink;

pub use device::{AudioDeviceInfo, AudioDeviceManager};
pub use engine::AudioEngine;
pub use shared::{AtomicF32, AtomicOutputStatus, OutputStatus};
pub use sink::{ClickSink, NullSink};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoOutputDevice,

    #[error("audio output device '{0}' not found")]
    DeviceNotFound(String),

    #[error("could not read output configuration: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported sample format {0:?} (supported: F32, I16, U16)")]
    UnsupportedSampleFormat(cpal::SampleFormat),

    #[error("could not build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("could not start output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}
