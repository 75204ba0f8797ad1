// Display events - What the scheduler publishes for beat indicators and the play button

/// One fired beat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatEvent {
    /// Position of the beat that just sounded, in [0, beats_per_bar)
    pub beat_index: u8,
    /// Index the next beat will use
    pub next_beat_index: u8,
    pub is_accent: bool,
    pub is_playing: bool,
    pub beats_per_bar: u8,
    pub bpm: u16,
}

/// State changes the display layer renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    Beat(BeatEvent),
    Started,
    Stopped,
    TempoChanged(u16),
    TimeSignatureChanged(u8),
}
