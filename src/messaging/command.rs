// Types de commandes - Communication input -> scheduling loop

/// Requests from the user-facing control surface.
///
/// These map one-to-one onto metronome operations; the scheduling loop
/// applies them between timer dispatches.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Toggle,
    Start,
    Stop,
    /// +/- buttons: move by this many BPM, clamped at the range edges
    NudgeTempo(i32),
    /// Slider: absolute value, clamped
    SlideTempo(i32),
    /// Numeric entry dialog: raw text, validated and possibly rejected
    EnterTempo(String),
    SetBeats(u8),
    SetAccent(bool),
    SetVolume(f32),
    Tap,
    Status,
    Quit,
}

impl ControlCommand {
    /// Parse one line typed on the terminal front-end.
    ///
    /// An empty line toggles playback, mirroring the space bar shortcut.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Some(Self::Toggle);
        };
        let arg = words.next();

        let command = match (head.to_ascii_lowercase().as_str(), arg) {
            ("t" | "toggle" | "space", None) => Self::Toggle,
            ("start" | "play", None) => Self::Start,
            ("stop", None) => Self::Stop,
            ("+" | "up", None) => Self::NudgeTempo(1),
            ("-" | "down", None) => Self::NudgeTempo(-1),
            ("bpm", Some(value)) => Self::EnterTempo(value.to_string()),
            ("slide", Some(value)) => Self::SlideTempo(value.parse().ok()?),
            ("beats", Some(value)) => Self::SetBeats(value.parse().ok()?),
            ("accent", Some("on")) => Self::SetAccent(true),
            ("accent", Some("off")) => Self::SetAccent(false),
            ("vol" | "volume", Some(value)) => Self::SetVolume(
                value.parse().ok().filter(|v: &f32| v.is_finite())?,
            ),
            ("tap" | ".", None) => Self::Tap,
            ("status" | "?", None) => Self::Status,
            ("q" | "quit" | "exit", None) => Self::Quit,
            _ => return None,
        };

        if words.next().is_some() {
            return None;
        }
        Some(command)
    }
}
