// Audio engine - Real-time CPAL callback
//
// # Format Support
//
// The engine supports three sample formats: F32, I16 and U16. The device's
// preferred format is read from `sample_format()` and the matching generic
// stream is built. All rendering happens in f32; conversion to the device
// format happens when writing the output buffer (`FromSample<f32>`, no
// allocation).
//
// # Flow
//
//   scheduler ── ClickRequest ──▶ ringbuffer ──▶ callback ──▶ ClickSynthesizer ──▶ device
//   scheduler ── volume ──▶ AtomicF32 ──────────▶ callback
//
// The stream is built paused and only started on the first `resume`.
//
// # Stream Limitations
//
// On macOS (CoreAudio) the Stream is not Send/Sync, so the engine lives on
// the control thread. The error callback updates the status and sends a
// notification; there is no automatic reconnection.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer};
use std::sync::{Arc, Mutex};

use super::device::AudioDeviceManager;
use super::dsp_utils::soft_clip;
use super::shared::{AtomicF32, AtomicOutputStatus, OutputStatus};
use super::sink::ClickSink;
use super::AudioError;
use crate::config::AudioSettings;
use crate::messaging::channels::{
    ClickConsumer, ClickProducer, NotificationProducer, create_click_channel,
};
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::synth::click::{ClickRequest, ClickSynthesizer};

pub struct AudioEngine {
    _device: Device,
    stream: Stream,
    device_name: String,
    sample_rate: f32,
    channels: usize,
    volume: AtomicF32,
    status: AtomicOutputStatus,
    click_tx: ClickProducer,
    dropped_clicks: u64,
}

impl AudioEngine {
    pub fn new(
        settings: &AudioSettings,
        initial_volume: f32,
        notification_tx: Arc<Mutex<NotificationProducer>>,
    ) -> Result<Self, AudioError> {
        let device =
            AudioDeviceManager::new().select_output_device(settings.device.as_deref())?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Audio device: {}", device_name);

        let supported_config = device.default_output_config()?;
        let sample_format = supported_config.sample_format();
        log::debug!("Audio config: {:?}", supported_config);

        let sample_rate = supported_config.sample_rate().0 as f32;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.into();

        let volume = AtomicF32::new(initial_volume.clamp(0.0, 1.0));
        let status = AtomicOutputStatus::new(OutputStatus::Suspended);

        let (click_tx, click_rx) = create_click_channel(settings.command_capacity.max(1));
        let synth = ClickSynthesizer::new(
            sample_rate,
            settings.voice_capacity,
            volume.get(),
            settings.volume_smoothing_ms,
        );

        let callback_state = CallbackState {
            click_rx,
            synth,
            volume: volume.clone(),
            channels,
        };

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &config,
                callback_state,
                status.clone(),
                notification_tx.clone(),
            ),
            SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &config,
                callback_state,
                status.clone(),
                notification_tx.clone(),
            ),
            SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &config,
                callback_state,
                status.clone(),
                notification_tx.clone(),
            ),
            other => return Err(AudioError::UnsupportedSampleFormat(other)),
        }?;

        // Some backends start streams on creation
        if let Err(e) = stream.pause() {
            log::debug!("Output stream cannot be paused, leaving it running: {}", e);
            status.set(OutputStatus::Running);
        }

        log::info!("Audio engine ready: {} Hz, {} channels", sample_rate, channels);

        if let Ok(mut tx) = notification_tx.try_lock() {
            let notif = Notification::info(
                NotificationCategory::Audio,
                format!("Audio output: {} ({} Hz)", device_name, sample_rate),
            );
            let _ = tx.try_push(notif);
        }

        Ok(Self {
            _device: device,
            stream,
            device_name,
            sample_rate,
            channels,
            volume,
            status,
            click_tx,
            dropped_clicks: 0,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn status(&self) -> OutputStatus {
        self.status.get()
    }

    pub fn volume(&self) -> f32 {
        self.volume.get()
    }

    /// Clicks lost because the click ringbuffer was full
    pub fn dropped_clicks(&self) -> u64 {
        self.dropped_clicks
    }

    /// Build an output stream for sample type `T`; rendering stays in f32.
    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        mut state: CallbackState,
        status: AtomicOutputStatus,
        notification_tx: Arc<Mutex<NotificationProducer>>,
    ) -> Result<Stream, AudioError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // ========== SACRED ZONE ==========
                // No allocations, No I/O, No blocking locks
                state.render(data);
                // ========== SACRED ZONE END ==========
            },
            move |err| {
                // Runs outside the audio callback, I/O is fine here
                log::error!("Audio stream error: {}", err);
                status.set(OutputStatus::Error);

                if let Ok(mut tx) = notification_tx.try_lock() {
                    let notif = Notification::error(
                        NotificationCategory::Audio,
                        format!("Audio stream error: {}", err),
                    );
                    let _ = tx.try_push(notif);
                }
            },
            None,
        )?;

        Ok(stream)
    }
}

impl ClickSink for AudioEngine {
    fn render_click(&mut self, request: ClickRequest) {
        if self.click_tx.try_push(request).is_err() {
            self.dropped_clicks += 1;
            log::debug!("Click queue full, dropping click");
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume.set(volume.clamp(0.0, 1.0));
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        if self.status.get() == OutputStatus::Running {
            return Ok(());
        }
        self.stream.play()?;
        self.status.set(OutputStatus::Running);
        log::debug!("Audio output resumed");
        Ok(())
    }
}

/// Everything the audio callback owns
struct CallbackState {
    click_rx: ClickConsumer,
    synth: ClickSynthesizer,
    volume: AtomicF32,
    channels: usize,
}

impl CallbackState {
    fn render<T>(&mut self, data: &mut [T])
    where
        T: Sample + FromSample<f32>,
    {
        while let Some(request) = self.click_rx.try_pop() {
            self.synth.play(request);
        }
        // The atomic wins over the volume carried by queued requests
        self.synth.set_master_volume(self.volume.get());

        for frame in data.chunks_mut(self.channels.max(1)) {
            let sample = T::from_sample(soft_clip(self.synth.next_sample()));
            // mono → all channels
            for channel_sample in frame.iter_mut() {
                *channel_sample = sample;
            }
        }
    }
}
