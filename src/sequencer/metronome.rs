// Metronome - beat scheduler driving one click per beat
//
// States: Stopped ⇄ Playing. `start` fires beat 0 immediately and arms a
// repeating timer at 60000/bpm ms; `stop` cancels it. Changing the tempo
// while playing is a single restart transition (timer re-armed, bar
// re-synchronised on beat 0).
//
// All state lives on the thread that owns the `Metronome`. Timers are only
// dispatched from `poll`, so nothing fires behind the caller's back.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ringbuf::traits::Producer;
use std::time::Duration;

use super::MetronomeError;
use super::clock::Clock;
use super::tap_tempo::TapTempoEstimator;
use super::tempo::{Bpm, TempoState, TimeSignature};
use super::timer::{TimerId, TimerQueue, TimerTask};
use crate::audio::sink::ClickSink;
use crate::messaging::channels::DisplayProducer;
use crate::messaging::display::{BeatEvent, DisplayEvent};
use crate::synth::click::ClickRequest;

/// Master volume when nothing else is configured
pub const DEFAULT_VOLUME: f32 = 0.7;

/// Read-only view of the metronome for status lines and tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetronomeSnapshot {
    pub bpm: u16,
    pub beats_per_bar: u8,
    pub accent_first: bool,
    pub volume: f32,
    pub is_playing: bool,
    pub current_beat_index: u8,
}

pub struct Metronome<S: ClickSink> {
    tempo: TempoState,
    /// Index of the next beat to sound, always < beats per bar
    current_beat_index: u8,
    /// Present iff playing
    beat_timer: Option<TimerId>,
    volume: f32,

    taps: TapTempoEstimator,
    purge_timer: Option<TimerId>,

    timers: TimerQueue,
    clock: Box<dyn Clock>,
    sink: S,
    events: Option<DisplayProducer>,
    rng: StdRng,
}

impl<S: ClickSink> Metronome<S> {
    pub fn new(tempo: TempoState, volume: f32, clock: impl Clock + 'static, mut sink: S) -> Self {
        let volume = volume.clamp(0.0, 1.0);
        sink.set_volume(volume);

        Self {
            tempo,
            current_beat_index: 0,
            beat_timer: None,
            volume,
            taps: TapTempoEstimator::new(),
            purge_timer: None,
            timers: TimerQueue::new(),
            clock: Box::new(clock),
            sink,
            events: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// 120 BPM, 4 beats, accented downbeat, volume 0.7
    pub fn with_defaults(clock: impl Clock + 'static, sink: S) -> Self {
        Self::new(TempoState::default(), DEFAULT_VOLUME, clock, sink)
    }

    /// Publish beat and state-change events to the display layer
    pub fn with_events(mut self, events: DisplayProducer) -> Self {
        self.events = Some(events);
        self
    }

    /// Make the per-click noise reproducible
    pub fn with_noise_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    // ---------- Tempo ----------

    /// Direct entry: out-of-range values are rejected, tempo is left untouched.
    pub fn set_tempo(&mut self, bpm: u16) -> Result<(), MetronomeError> {
        let bpm = Bpm::new(bpm)?;
        self.apply_tempo(bpm);
        Ok(())
    }

    /// Slider path: pinned to the accepted range
    pub fn set_tempo_clamped(&mut self, bpm: i32) -> Bpm {
        let bpm = Bpm::clamped(bpm);
        self.apply_tempo(bpm);
        bpm
    }

    pub fn increment_tempo(&mut self) -> Bpm {
        let bpm = self.tempo.bpm.incremented();
        self.apply_tempo(bpm);
        bpm
    }

    pub fn decrement_tempo(&mut self) -> Bpm {
        let bpm = self.tempo.bpm.decremented();
        self.apply_tempo(bpm);
        bpm
    }

    /// Typed numeric entry. On error nothing changes and the caller should
    /// show [`bpm`](Self::bpm) again.
    pub fn set_tempo_from_entry(&mut self, input: &str) -> Result<Bpm, MetronomeError> {
        let bpm = Bpm::parse_entry(input)?;
        self.apply_tempo(bpm);
        Ok(bpm)
    }

    fn apply_tempo(&mut self, bpm: Bpm) {
        self.tempo.bpm = bpm;
        log::debug!("Tempo set to {}", bpm);
        self.publish(DisplayEvent::TempoChanged(bpm.get()));

        if self.is_playing() {
            self.restart();
        }
    }

    // ---------- Bar ----------

    /// Resets the beat index to 0 whether or not playback is running
    pub fn set_time_signature(&mut self, beats_per_bar: u8) -> Result<(), MetronomeError> {
        let time_signature = TimeSignature::new(beats_per_bar)?;
        self.tempo.time_signature = time_signature;
        self.current_beat_index = 0;
        log::debug!("Time signature set to {}", time_signature);
        self.publish(DisplayEvent::TimeSignatureChanged(beats_per_bar));
        Ok(())
    }

    pub fn set_accent_first(&mut self, accent_first: bool) {
        self.tempo.accent_first_beat = accent_first;
    }

    /// Clamped to [0, 1]; also scales clicks already sounding. NaN and
    /// infinities leave the volume unchanged.
    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            log::warn!("Ignoring volume {}", volume);
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        self.sink.set_volume(self.volume);
    }

    // ---------- Transport ----------

    pub fn start(&mut self) {
        if self.is_playing() {
            return;
        }

        if let Err(e) = self.sink.resume() {
            log::warn!("Audio output unavailable, continuing without sound: {}", e);
        }

        self.arm_beat_timer();
        log::debug!("Playback started at {}", self.tempo.bpm);
        self.publish(DisplayEvent::Started);
        self.fire_beat();
    }

    pub fn stop(&mut self) {
        let Some(timer) = self.beat_timer.take() else {
            return;
        };

        self.timers.cancel(timer);
        self.current_beat_index = 0;
        log::debug!("Playback stopped");
        self.publish(DisplayEvent::Stopped);
    }

    /// Start when stopped, stop when playing. Returns the new playing state.
    pub fn toggle(&mut self) -> bool {
        if self.is_playing() {
            self.stop();
        } else {
            self.start();
        }
        self.is_playing()
    }

    /// Playing → Playing with the current tempo: one transition, no
    /// intermediate stopped state is observable.
    fn restart(&mut self) {
        if let Some(timer) = self.beat_timer.take() {
            self.timers.cancel(timer);
        }
        self.arm_beat_timer();
        self.fire_beat();
    }

    fn arm_beat_timer(&mut self) {
        self.current_beat_index = 0;
        let now = self.clock.now();
        let period = self.tempo.bpm.interval();
        self.beat_timer = Some(self.timers.schedule_repeating(now, period, TimerTask::Beat));
    }

    /// Sound the current beat and advance the bar position.
    ///
    /// Called once on `start`, then by `poll` on every timer tick.
    pub fn fire_beat(&mut self) {
        let beat_index = self.current_beat_index;
        let is_accent = self.tempo.is_accent(beat_index);

        let request = ClickRequest::new(is_accent, self.volume, self.rng.r#gen());
        self.sink.render_click(request);

        let beats_per_bar = self.tempo.time_signature.beats();
        self.current_beat_index = (beat_index + 1) % beats_per_bar;

        let event = BeatEvent {
            beat_index,
            next_beat_index: self.current_beat_index,
            is_accent,
            is_playing: self.is_playing(),
            beats_per_bar,
            bpm: self.tempo.bpm.get(),
        };
        self.publish(DisplayEvent::Beat(event));
    }

    // ---------- Tap tempo ----------

    /// Record a tap at the current time. An in-range estimate becomes the new
    /// tempo; an out-of-range one is dropped without touching the tempo.
    ///
    /// While stopped, an accepted estimate sounds one regular click. While
    /// playing, the restart downbeat confirms it.
    pub fn register_tap(&mut self) -> Option<Bpm> {
        let now = self.clock.now();

        // The purge timer may be overdue if poll has not run yet
        let stale = self.taps.purge_stale(now);
        if stale > 0 {
            log::debug!("Dropped {} stale taps before estimating", stale);
        }
        let estimate = self.taps.register_tap(now);

        if let Some(pending) = self.purge_timer.take() {
            self.timers.cancel(pending);
        }
        let version = self.taps.version();
        self.purge_timer = Some(self.timers.schedule_once(
            now,
            TapTempoEstimator::STALE_AFTER,
            TimerTask::PurgeTaps { version },
        ));

        match estimate {
            Some(bpm) => {
                log::debug!("Tap tempo estimate: {}", bpm);
                self.apply_tempo(bpm);
                if !self.is_playing() {
                    let request = ClickRequest::new(false, self.volume, self.rng.r#gen());
                    self.sink.render_click(request);
                }
            }
            None => {
                if let Some(raw) = self.taps.raw_bpm() {
                    log::debug!("Discarding tap estimate of {:.1} BPM", raw);
                }
            }
        }

        estimate
    }

    // ---------- Timer dispatch ----------

    /// Run every timer task due at the current time. Returns the number of
    /// beats fired.
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now();
        let mut beats = 0;

        while let Some(task) = self.timers.pop_due(now) {
            match task {
                TimerTask::Beat => {
                    if self.is_playing() {
                        self.fire_beat();
                        beats += 1;
                    }
                }
                TimerTask::PurgeTaps { version } => {
                    if version == self.taps.version() {
                        self.purge_timer = None;
                        let purged = self.taps.purge_stale(now);
                        log::debug!("Purged {} stale taps", purged);
                    }
                }
            }
        }

        beats
    }

    /// Absolute time of the next pending timer task
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// How long the owner may sleep before calling `poll` again
    pub fn time_until_next(&self) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_sub(self.clock.now()))
    }

    /// Period of the running beat timer
    pub fn beat_interval(&self) -> Option<Duration> {
        self.beat_timer.and_then(|timer| self.timers.period(timer))
    }

    // ---------- Queries ----------

    pub fn bpm(&self) -> Bpm {
        self.tempo.bpm
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.tempo.time_signature
    }

    pub fn accent_first(&self) -> bool {
        self.tempo.accent_first_beat
    }

    pub fn tempo_state(&self) -> TempoState {
        self.tempo
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_playing(&self) -> bool {
        self.beat_timer.is_some()
    }

    pub fn current_beat_index(&self) -> u8 {
        self.current_beat_index
    }

    /// Taps currently held for estimation
    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    pub fn snapshot(&self) -> MetronomeSnapshot {
        MetronomeSnapshot {
            bpm: self.tempo.bpm.get(),
            beats_per_bar: self.tempo.time_signature.beats(),
            accent_first: self.tempo.accent_first_beat,
            volume: self.volume,
            is_playing: self.is_playing(),
            current_beat_index: self.current_beat_index,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn publish(&mut self, event: DisplayEvent) {
        if let Some(events) = self.events.as_mut() {
            // Display is lossy
            let _ = events.try_push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioError;
    use crate::messaging::channels::create_display_channel;
    use crate::sequencer::clock::ManualClock;
    use ringbuf::traits::Consumer;

    #[derive(Default)]
    struct RecordingSink {
        clicks: Vec<ClickRequest>,
        volume: f32,
        resumes: usize,
        fail_resume: bool,
    }

    impl ClickSink for RecordingSink {
        fn render_click(&mut self, request: ClickRequest) {
            self.clicks.push(request);
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }

        fn resume(&mut self) -> Result<(), AudioError> {
            self.resumes += 1;
            if self.fail_resume {
                Err(AudioError::NoOutputDevice)
            } else {
                Ok(())
            }
        }
    }

    fn metronome() -> (ManualClock, Metronome<RecordingSink>) {
        let clock = ManualClock::new();
        let metronome = Metronome::with_defaults(clock.clone(), RecordingSink::default());
        (clock, metronome)
    }

    fn accents(metronome: &Metronome<RecordingSink>) -> Vec<bool> {
        metronome.sink().clicks.iter().map(|c| c.is_accent()).collect()
    }

    #[test]
    fn test_initial_state() {
        let (_clock, metronome) = metronome();
        let snapshot = metronome.snapshot();
        assert_eq!(snapshot.bpm, 120);
        assert_eq!(snapshot.beats_per_bar, 4);
        assert!(snapshot.accent_first);
        assert_eq!(snapshot.volume, 0.7);
        assert!(!snapshot.is_playing);
        assert_eq!(snapshot.current_beat_index, 0);
        assert_eq!(metronome.sink().volume, 0.7);
        assert!(metronome.next_deadline().is_none());
    }

    #[test]
    fn test_start_fires_downbeat_immediately() {
        let (_clock, mut metronome) = metronome();
        metronome.start();

        assert!(metronome.is_playing());
        assert_eq!(accents(&metronome), vec![true]);
        assert_eq!(metronome.current_beat_index(), 1);
        assert_eq!(metronome.beat_interval(), Some(Duration::from_millis(500)));
        assert_eq!(metronome.sink().resumes, 1);
    }

    #[test]
    fn test_start_twice_is_noop() {
        let (_clock, mut metronome) = metronome();
        metronome.start();
        metronome.start();
        assert_eq!(metronome.sink().clicks.len(), 1);
        assert_eq!(metronome.sink().resumes, 1);
    }

    #[test]
    fn test_timer_fires_following_beats() {
        let (clock, mut metronome) = metronome();
        metronome.start();

        clock.advance(Duration::from_millis(499));
        assert_eq!(metronome.poll(), 0);
        clock.advance(Duration::from_millis(1));
        assert_eq!(metronome.poll(), 1);

        for _ in 0..3 {
            clock.advance(Duration::from_millis(500));
            metronome.poll();
        }
        assert_eq!(accents(&metronome), vec![true, false, false, false, true]);
    }

    #[test]
    fn test_stop_cancels_timer_and_resets_index() {
        let (clock, mut metronome) = metronome();
        metronome.start();
        clock.advance(Duration::from_millis(500));
        metronome.poll();
        metronome.stop();

        assert!(!metronome.is_playing());
        assert_eq!(metronome.current_beat_index(), 0);
        assert!(metronome.beat_interval().is_none());

        clock.advance(Duration::from_secs(10));
        assert_eq!(metronome.poll(), 0);
        assert_eq!(metronome.sink().clicks.len(), 2);

        metronome.stop();
        assert_eq!(metronome.current_beat_index(), 0);
    }

    #[test]
    fn test_toggle() {
        let (_clock, mut metronome) = metronome();
        assert!(metronome.toggle());
        assert!(!metronome.toggle());
        assert!(metronome.toggle());
        assert_eq!(metronome.sink().clicks.len(), 2);
    }

    #[test]
    fn test_set_tempo_rejects_out_of_range() {
        let (_clock, mut metronome) = metronome();
        assert!(metronome.set_tempo(39).is_err());
        assert!(metronome.set_tempo(201).is_err());
        assert_eq!(metronome.bpm().get(), 120);
        assert!(metronome.set_tempo(200).is_ok());
        assert_eq!(metronome.bpm().get(), 200);
    }

    #[test]
    fn test_clamped_paths_pin_at_edges() {
        let (_clock, mut metronome) = metronome();
        assert_eq!(metronome.set_tempo_clamped(500).get(), 200);
        assert_eq!(metronome.increment_tempo().get(), 200);
        assert_eq!(metronome.set_tempo_clamped(-3).get(), 40);
        assert_eq!(metronome.decrement_tempo().get(), 40);
        assert_eq!(metronome.increment_tempo().get(), 41);
    }

    #[test]
    fn test_entry_errors_leave_tempo() {
        let (_clock, mut metronome) = metronome();
        assert!(metronome.set_tempo_from_entry("fast").is_err());
        assert!(metronome.set_tempo_from_entry("250").is_err());
        assert_eq!(metronome.bpm().get(), 120);
        assert_eq!(metronome.set_tempo_from_entry(" 96 ").map(Bpm::get), Ok(96));
    }

    #[test]
    fn test_tempo_change_while_playing_restarts() {
        let (clock, mut metronome) = metronome();
        metronome.start();
        clock.advance(Duration::from_millis(500));
        metronome.poll();
        assert_eq!(metronome.current_beat_index(), 2);

        metronome.set_tempo(60).unwrap();
        assert!(metronome.is_playing());
        assert_eq!(metronome.beat_interval(), Some(Duration::from_secs(1)));
        assert_eq!(accents(&metronome), vec![true, false, true]);
        assert_eq!(metronome.current_beat_index(), 1);

        // Old 500ms deadline is gone
        clock.advance(Duration::from_millis(500));
        assert_eq!(metronome.poll(), 0);
        clock.advance(Duration::from_millis(500));
        assert_eq!(metronome.poll(), 1);
    }

    #[test]
    fn test_tempo_change_while_stopped_does_not_start() {
        let (_clock, mut metronome) = metronome();
        metronome.set_tempo(90).unwrap();
        assert!(!metronome.is_playing());
        assert!(metronome.sink().clicks.is_empty());
    }

    #[test]
    fn test_time_signature_resets_index() {
        let (clock, mut metronome) = metronome();
        metronome.start();
        clock.advance(Duration::from_millis(500));
        metronome.poll();

        metronome.set_time_signature(3).unwrap();
        assert_eq!(metronome.current_beat_index(), 0);
        assert!(metronome.is_playing());

        clock.advance(Duration::from_millis(500));
        metronome.poll();
        assert_eq!(accents(&metronome), vec![true, false, true]);

        assert!(metronome.set_time_signature(7).is_err());
        assert!(metronome.set_time_signature(1).is_err());
        assert_eq!(metronome.time_signature().beats(), 3);
    }

    #[test]
    fn test_accent_disabled() {
        let (clock, mut metronome) = metronome();
        metronome.set_accent_first(false);
        metronome.start();
        for _ in 0..7 {
            clock.advance(Duration::from_millis(500));
            metronome.poll();
        }
        assert_eq!(metronome.sink().clicks.len(), 8);
        assert!(accents(&metronome).iter().all(|&a| !a));
    }

    #[test]
    fn test_volume_clamped_and_forwarded() {
        let (_clock, mut metronome) = metronome();
        metronome.set_volume(1.5);
        assert_eq!(metronome.volume(), 1.0);
        assert_eq!(metronome.sink().volume, 1.0);

        metronome.set_volume(0.0);
        metronome.start();
        assert_eq!(metronome.sink().clicks[0].master_volume, 0.0);
    }

    #[test]
    fn test_non_finite_volume_ignored() {
        let (_clock, mut metronome) = metronome();
        metronome.set_volume(0.4);
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            metronome.set_volume(bad);
            assert_eq!(metronome.volume(), 0.4);
            assert_eq!(metronome.sink().volume, 0.4);
        }

        metronome.start();
        assert_eq!(metronome.sink().clicks[0].master_volume, 0.4);
    }

    #[test]
    fn test_resume_failure_does_not_stop_scheduling() {
        let clock = ManualClock::new();
        let sink = RecordingSink {
            fail_resume: true,
            ..Default::default()
        };
        let mut metronome = Metronome::with_defaults(clock.clone(), sink);
        metronome.start();
        clock.advance(Duration::from_millis(500));
        metronome.poll();

        assert!(metronome.is_playing());
        assert_eq!(metronome.sink().clicks.len(), 2);
    }

    #[test]
    fn test_tap_tempo_sets_bpm() {
        let (clock, mut metronome) = metronome();
        assert_eq!(metronome.register_tap(), None);
        for _ in 0..3 {
            clock.advance(Duration::from_millis(400));
            metronome.register_tap();
        }
        assert_eq!(metronome.bpm().get(), 150);
    }

    #[test]
    fn test_tap_after_long_pause_ignores_overdue_history() {
        let (clock, mut metronome) = metronome();
        metronome.register_tap();
        clock.advance(Duration::from_millis(500));
        metronome.register_tap();
        assert_eq!(metronome.bpm().get(), 120);

        // Purge is overdue but poll never ran
        clock.advance(Duration::from_millis(3500));
        assert_eq!(metronome.register_tap(), None);
        assert_eq!(metronome.tap_count(), 1);

        clock.advance(Duration::from_millis(400));
        metronome.register_tap();
        clock.advance(Duration::from_millis(400));
        assert_eq!(metronome.register_tap().map(Bpm::get), Some(150));
        assert_eq!(metronome.tap_count(), 3);
    }

    #[test]
    fn test_accepted_tap_clicks_while_stopped() {
        let (clock, mut metronome) = metronome();
        metronome.register_tap();
        assert!(metronome.sink().clicks.is_empty());

        clock.advance(Duration::from_millis(500));
        metronome.register_tap();
        assert_eq!(accents(&metronome), vec![false]);

        // Out of range: no confirmation
        clock.advance(Duration::from_millis(10));
        metronome.register_tap();
        clock.advance(Duration::from_millis(10));
        assert_eq!(metronome.register_tap(), None);
        assert_eq!(metronome.sink().clicks.len(), 1);
        assert!(!metronome.is_playing());
    }

    #[test]
    fn test_accepted_tap_while_playing_restarts_on_downbeat() {
        let (clock, mut metronome) = metronome();
        metronome.start();
        metronome.register_tap();
        clock.advance(Duration::from_millis(400));
        metronome.register_tap();

        // Start downbeat, then the restart downbeat, no extra click
        assert_eq!(accents(&metronome), vec![true, true]);
        assert_eq!(metronome.bpm().get(), 150);
    }

    #[test]
    fn test_single_pending_purge_per_tap_history() {
        let (clock, mut metronome) = metronome();
        metronome.register_tap();
        clock.advance(Duration::from_secs(2));
        metronome.register_tap();
        assert_eq!(metronome.tap_count(), 2);

        // First purge would have been due here; it was replaced
        clock.advance(Duration::from_millis(1500));
        metronome.poll();
        assert_eq!(metronome.tap_count(), 2);

        clock.advance(Duration::from_millis(1500));
        metronome.poll();
        assert_eq!(metronome.tap_count(), 0);
        assert!(metronome.next_deadline().is_none());
    }

    #[test]
    fn test_display_events() {
        let (tx, mut rx) = create_display_channel(16);
        let mut metronome =
            Metronome::with_defaults(ManualClock::new(), RecordingSink::default()).with_events(tx);

        metronome.start();
        metronome.stop();

        assert_eq!(rx.try_pop(), Some(DisplayEvent::Started));
        match rx.try_pop() {
            Some(DisplayEvent::Beat(beat)) => {
                assert_eq!(beat.beat_index, 0);
                assert_eq!(beat.next_beat_index, 1);
                assert!(beat.is_accent);
                assert!(beat.is_playing);
                assert_eq!(beat.beats_per_bar, 4);
                assert_eq!(beat.bpm, 120);
            }
            other => panic!("expected beat event, got {:?}", other),
        }
        assert_eq!(rx.try_pop(), Some(DisplayEvent::Stopped));
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let run = || {
            let clock = ManualClock::new();
            let mut metronome =
                Metronome::with_defaults(clock, RecordingSink::default()).with_noise_seed(5);
            metronome.start();
            metronome.sink().clicks[0].noise_seed
        };
        assert_eq!(run(), run());
    }
}
