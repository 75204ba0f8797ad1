// Destination for the clicks produced by the sequencer

use super::AudioError;
use crate::synth::click::ClickRequest;

/// Where the scheduler sends one click per beat.
///
/// Implementations must return quickly: `render_click` runs on the
/// scheduling path and must not wait for audio to be produced.
pub trait ClickSink {
    fn render_click(&mut self, request: ClickRequest);

    /// Master volume for the current and all subsequent clicks
    fn set_volume(&mut self, volume: f32);

    /// Bring a suspended output back up before playback starts
    fn resume(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

impl<S: ClickSink + ?Sized> ClickSink for Box<S> {
    fn render_click(&mut self, request: ClickRequest) {
        (**self).render_click(request)
    }

    fn set_volume(&mut self, volume: f32) {
        (**self).set_volume(volume)
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        (**self).resume()
    }
}

/// Discards every click. Used when no output device is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink {
    clicks: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clicks received so far
    pub fn clicks(&self) -> u64 {
        self.clicks
    }
}

impl ClickSink for NullSink {
    fn render_click(&mut self, _request: ClickRequest) {
        self.clicks += 1;
    }

    fn set_volume(&mut self, _volume: f32) {}
}
