use serde::{Deserialize, Serialize};

use crate::utilities::sound::{Voice, render};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundType {
    Beep,
    Kick,
    Click,
    Cowbell,
    Hihat,
    Woodblock,
}

impl Default for SoundType {
    fn default() -> Self {
        SoundType::Click
    }
}

impl SoundType {
    pub const ALL: [SoundType; 6] = [
        SoundType::Beep,
        SoundType::Kick,
        SoundType::Click,
        SoundType::Cowbell,
        SoundType::Hihat,
        SoundType::Woodblock,
    ];

    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|s| s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Self {
        let idx = Self::ALL.iter().position(|s| s == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SoundType::Beep => "Beep",
            SoundType::Kick => "Kick",
            SoundType::Click => "Click",
            SoundType::Cowbell => "Cowbell",
            SoundType::Hihat => "Hi-hat",
            SoundType::Woodblock => "Woodblock",
        }
    }

    pub(crate) fn voice(&self) -> Voice {
        match self {
            SoundType::Beep => Voice {
                duration_ms: 50,
                partials: &[(800.0, 0.3)],
                decay: 0.0,
                pitch_drop: 0.0,
                noise: 0.0,
            },
            SoundType::Kick => Voice {
                duration_ms: 150,
                partials: &[(60.0, 0.6)],
                decay: 12.0,
                pitch_drop: 10.0,
                noise: 0.0,
            },
            SoundType::Click => Voice {
                duration_ms: 15,
                partials: &[(2000.0, 0.4)],
                decay: 40.0,
                pitch_drop: 0.0,
                noise: 0.0,
            },
            SoundType::Cowbell => Voice {
                duration_ms: 100,
                partials: &[(800.0, 0.3), (1920.0, 0.2), (2560.0, 0.1)],
                decay: 8.0,
                pitch_drop: 0.0,
                noise: 0.0,
            },
            SoundType::Hihat => Voice {
                duration_ms: 50,
                partials: &[(8000.0, 0.05)],
                decay: 30.0,
                pitch_drop: 0.0,
                noise: 0.25,
            },
            SoundType::Woodblock => Voice {
                duration_ms: 60,
                partials: &[(1200.0, 0.25), (800.0, 0.15)],
                decay: 15.0,
                pitch_drop: 0.0,
                noise: 0.0,
            },
        }
    }

    pub fn create_sound(&self) -> Vec<f32> {
        render(&self.voice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle() {
        assert_eq!(SoundType::Woodblock.next(), SoundType::Beep);
        assert_eq!(SoundType::Beep.prev(), SoundType::Woodblock);
        for sound in SoundType::ALL {
            assert_eq!(sound.next().prev(), sound);
        }
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&SoundType::Hihat).unwrap(), "\"hihat\"");
        let sound: SoundType = serde_json::from_str("\"cowbell\"").unwrap();
        assert_eq!(sound, SoundType::Cowbell);
    }
}
