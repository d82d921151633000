//! A metronome engine: steady tempo, meter changes that restart the measure,
//! and accented first beats, plus the playlist store, settings and terminal
//! pieces the `metronome` binary is built from.

pub mod config;
pub mod error;
pub mod scheduler;
pub mod store;
pub mod tempo;
pub mod time_signature;
pub mod timer;
pub mod utilities;

pub use config::{ConfigManager, Settings};
pub use error::{AudioError, ConfigError, MetronomeError, StoreError};
pub use scheduler::{BeatEvent, BeatScheduler};
pub use store::{Playlist, PlaylistStore, Song, SqliteStore};
pub use tempo::Tempo;
pub use time_signature::TimeSignature;
pub use timer::{Clock, IntervalTimer, ManualClock, SystemClock, Timer, TimerHandle};
