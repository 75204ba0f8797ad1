// Configuration - startup settings read from a RON file
//
// Looked up at `--config <path>` or, failing that, at
// `<config dir>/click-metronome/config.ron`:
// - Linux: `~/.config/click-metronome/config.ron`
// - macOS: `~/Library/Application Support/click-metronome/config.ron`
// - Windows: `%APPDATA%\click-metronome\config.ron`
//
// Every field is optional; missing ones take their defaults. The file is
// never written back.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::sequencer::metronome::DEFAULT_VOLUME;
use crate::sequencer::{Bpm, TempoState, TimeSignature};
use crate::synth::click::ClickSynthesizer;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("RON error: {0}")]
    Parse(#[from] ron::de::SpannedError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetronomeConfig {
    pub bpm: u16,
    pub time_signature: u8,
    pub accent_first: bool,
    pub volume: f32,
    pub audio: AudioSettings,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            bpm: Bpm::DEFAULT,
            time_signature: TimeSignature::default().beats(),
            accent_first: true,
            volume: DEFAULT_VOLUME,
            audio: AudioSettings::default(),
        }
    }
}

/// Output device and audio-thread sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Output device name; `None` picks the host default
    pub device: Option<String>,
    /// Clicks that may sound at once
    pub voice_capacity: usize,
    /// Slots in the click request ringbuffer
    pub command_capacity: usize,
    pub volume_smoothing_ms: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            device: None,
            voice_capacity: ClickSynthesizer::DEFAULT_VOICES,
            command_capacity: 64,
            volume_smoothing_ms: 10.0,
        }
    }
}

impl MetronomeConfig {
    /// Parse and validate the file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&content)
    }

    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        let config: MetronomeConfig = ron::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path if given (must exist), else the default location if a
    /// file is there, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                log::info!("Loading config from {:?}", path);
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("click-metronome").join("config.ron"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Bpm::new(self.bpm).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        TimeSignature::new(self.time_signature).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if !(0.0..=1.0).contains(&self.volume) {
            return Err(ConfigError::Invalid(format!(
                "volume {} is outside 0.0-1.0",
                self.volume
            )));
        }
        if self.audio.voice_capacity == 0 {
            return Err(ConfigError::Invalid("voice_capacity must be at least 1".into()));
        }
        if self.audio.command_capacity == 0 {
            return Err(ConfigError::Invalid("command_capacity must be at least 1".into()));
        }
        if !self.audio.volume_smoothing_ms.is_finite() || self.audio.volume_smoothing_ms < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "volume_smoothing_ms {} must be >= 0",
                self.audio.volume_smoothing_ms
            )));
        }
        Ok(())
    }

    /// Tempo settings for the scheduler; call after `validate`
    pub fn tempo_state(&self) -> Result<TempoState, ConfigError> {
        let bpm = Bpm::new(self.bpm).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let time_signature =
            TimeSignature::new(self.time_signature).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(TempoState::new(bpm, time_signature, self.accent_first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = MetronomeConfig::default();
        assert_eq!(config.bpm, 120);
        assert_eq!(config.time_signature, 4);
        assert!(config.accent_first);
        assert_eq!(config.volume, 0.7);
        assert_eq!(config.audio.device, None);
        assert_eq!(config.audio.voice_capacity, 8);
        assert!(config.validate().is_ok());
        assert_eq!(config.tempo_state().unwrap(), TempoState::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = MetronomeConfig::from_ron("(bpm: 90, audio: (device: Some(\"USB\")))").unwrap();
        assert_eq!(config.bpm, 90);
        assert_eq!(config.time_signature, 4);
        assert_eq!(config.audio.device.as_deref(), Some("USB"));
        assert_eq!(config.audio.command_capacity, 64);
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        assert!(matches!(
            MetronomeConfig::from_ron("(bpm: 300)"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            MetronomeConfig::from_ron("(time_signature: 9)"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            MetronomeConfig::from_ron("(volume: 1.5)"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            MetronomeConfig::from_ron("(audio: (voice_capacity: 0))"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_file() {
        assert!(matches!(
            MetronomeConfig::from_ron("(bpm: \"fast\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "(bpm: 150, time_signature: 3, accent_first: false, volume: 0.5)").unwrap();

        let config = MetronomeConfig::load_or_default(Some(file.path())).unwrap();
        let tempo = config.tempo_state().unwrap();
        assert_eq!(tempo.bpm.get(), 150);
        assert_eq!(tempo.time_signature.beats(), 3);
        assert!(!tempo.accent_first_beat);
        assert_eq!(config.volume, 0.5);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.ron");
        assert!(matches!(
            MetronomeConfig::load_or_default(Some(&missing)),
            Err(ConfigError::Io { .. })
        ));
    }
}
