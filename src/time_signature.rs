use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MetronomeError;

/// The meters the metronome can count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeSignature {
    ThreeFour,
    #[default]
    FourFour,
    FiveFour,
    SixEight,
}

impl TimeSignature {
    pub const ALL: [TimeSignature; 4] = [
        TimeSignature::ThreeFour,
        TimeSignature::FourFour,
        TimeSignature::FiveFour,
        TimeSignature::SixEight,
    ];

    pub fn beats_per_measure(self) -> u32 {
        self.numerator()
    }

    pub fn numerator(self) -> u32 {
        match self {
            TimeSignature::ThreeFour => 3,
            TimeSignature::FourFour => 4,
            TimeSignature::FiveFour => 5,
            TimeSignature::SixEight => 6,
        }
    }

    pub fn denominator(self) -> u32 {
        match self {
            TimeSignature::SixEight => 8,
            _ => 4,
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator(), self.denominator())
    }
}

impl FromStr for TimeSignature {
    type Err = MetronomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        Self::ALL
            .into_iter()
            .find(|sig| sig.to_string() == compact)
            .ok_or_else(|| MetronomeError::InvalidTimeSignature(s.to_string()))
    }
}

impl TryFrom<String> for TimeSignature {
    type Error = MetronomeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeSignature> for String {
    fn from(sig: TimeSignature) -> Self {
        sig.to_string()
    }
}
