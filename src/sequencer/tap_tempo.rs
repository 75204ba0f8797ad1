// Tap tempo - BPM estimation from user tap timestamps

use super::tempo::Bpm;
use std::collections::VecDeque;
use std::time::Duration;

/// Tempo estimator fed with monotonic tap timestamps.
///
/// Keeps the most recent [`TapTempoEstimator::HISTORY_LEN`] taps. Every tap
/// bumps a version number so a deferred purge scheduled for an older history
/// can be recognised as stale.
#[derive(Debug, Clone, Default)]
pub struct TapTempoEstimator {
    taps: VecDeque<Duration>,
    version: u64,
}

impl TapTempoEstimator {
    /// Maximum number of taps kept for averaging
    pub const HISTORY_LEN: usize = 8;

    /// Taps at least this old are dropped by [`purge_stale`](Self::purge_stale)
    pub const STALE_AFTER: Duration = Duration::from_secs(3);

    pub fn new() -> Self {
        Self {
            taps: VecDeque::with_capacity(Self::HISTORY_LEN + 1),
            version: 0,
        }
    }

    /// Record a tap and return the tempo estimate, if any.
    ///
    /// Returns `None` with fewer than two taps or when the averaged tempo
    /// falls outside the accepted BPM range (erratic taps are not an error).
    pub fn register_tap(&mut self, now: Duration) -> Option<Bpm> {
        self.taps.push_back(now);
        if self.taps.len() > Self::HISTORY_LEN {
            self.taps.pop_front();
        }
        self.version += 1;

        self.estimate()
    }

    /// Estimate from the current history without recording a tap
    pub fn estimate(&self) -> Option<Bpm> {
        let bpm = self.raw_bpm()?.round();
        if !bpm.is_finite() || bpm < 0.0 || bpm > u16::MAX as f64 {
            return None;
        }
        Bpm::new(bpm as u16).ok()
    }

    /// Unrounded, unvalidated tempo: 60000 / mean inter-tap interval in ms
    pub fn raw_bpm(&self) -> Option<f64> {
        if self.taps.len() < 2 {
            return None;
        }

        let total_ms: f64 = self
            .taps
            .iter()
            .zip(self.taps.iter().skip(1))
            .map(|(earlier, later)| later.saturating_sub(*earlier).as_secs_f64() * 1000.0)
            .sum();
        let average_ms = total_ms / (self.taps.len() - 1) as f64;

        if average_ms <= 0.0 {
            return None;
        }
        Some(60_000.0 / average_ms)
    }

    /// Drop taps that are [`STALE_AFTER`](Self::STALE_AFTER) old or older.
    /// Returns how many were removed.
    pub fn purge_stale(&mut self, now: Duration) -> usize {
        let before = self.taps.len();
        self.taps
            .retain(|&tap| now.saturating_sub(tap) < Self::STALE_AFTER);
        before - self.taps.len()
    }

    /// Incremented on every tap
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}
