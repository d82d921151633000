use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MetronomeError;

/// A validated tempo in whole beats per minute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Tempo(u32);

impl Tempo {
    pub const MIN_BPM: u32 = 30;
    pub const MAX_BPM: u32 = 240;
    pub const DEFAULT_BPM: u32 = 60;

    pub fn new(bpm: u32) -> Result<Self, MetronomeError> {
        if (Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm) {
            Ok(Self(bpm))
        } else {
            Err(MetronomeError::OutOfRange {
                bpm,
                min: Self::MIN_BPM,
                max: Self::MAX_BPM,
            })
        }
    }

    /// Builds a tempo from any integer, pinning it to the nearest bound.
    pub fn clamped(bpm: i64) -> Self {
        Self(bpm.clamp(Self::MIN_BPM as i64, Self::MAX_BPM as i64) as u32)
    }

    pub fn bpm(self) -> u32 {
        self.0
    }

    /// Milliseconds between beats, truncated (61 BPM is 983 ms, not 984).
    pub fn interval_ms(self) -> u64 {
        60_000 / self.0 as u64
    }

    pub fn interval(self) -> Duration {
        Duration::from_millis(self.interval_ms())
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self(Self::DEFAULT_BPM)
    }
}

impl TryFrom<u32> for Tempo {
    type Error = MetronomeError;

    fn try_from(bpm: u32) -> Result<Self, Self::Error> {
        Self::new(bpm)
    }
}

impl From<Tempo> for u32 {
    fn from(tempo: Tempo) -> Self {
        tempo.0
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.0)
    }
}
