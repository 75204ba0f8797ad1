// Lock-free state shared between the control thread and the audio callback

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

/// f32 stored as its bit pattern in an `AtomicU32`
#[derive(Clone)]
pub struct AtomicF32 {
    bits: Arc<AtomicU32>,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(value.to_bits())),
        }
    }

    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Lifecycle of the output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStatus {
    /// Stream built but paused; waiting for the first start
    Suspended = 0,
    Running = 1,
    /// The backend reported a stream error
    Error = 2,
    /// No stream could be opened
    Unavailable = 3,
}

impl From<u8> for OutputStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => OutputStatus::Suspended,
            1 => OutputStatus::Running,
            2 => OutputStatus::Error,
            _ => OutputStatus::Unavailable,
        }
    }
}

#[derive(Clone)]
pub struct AtomicOutputStatus {
    inner: Arc<AtomicU8>,
}

impl AtomicOutputStatus {
    pub fn new(status: OutputStatus) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(status as u8)),
        }
    }

    pub fn get(&self) -> OutputStatus {
        OutputStatus::from(self.inner.load(Ordering::Relaxed))
    }

    pub fn set(&self, status: OutputStatus) {
        self.inner.store(status as u8, Ordering::Relaxed);
    }
}

impl Default for AtomicOutputStatus {
    fn default() -> Self {
        Self::new(OutputStatus::Unavailable)
    }
}
