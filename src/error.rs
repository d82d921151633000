use thiserror::Error;

/// Errors raised by the beat engine and its value types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetronomeError {
    #[error("tempo {bpm} BPM is out of range ({min}-{max})")]
    OutOfRange { bpm: u32, min: u32, max: u32 },

    #[error("unsupported time signature: {0:?}")]
    InvalidTimeSignature(String),
}

/// Errors raised by the playlist store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("invalid song: {0}")]
    InvalidSong(#[from] MetronomeError),
}

/// Errors raised while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Errors raised while opening the audio output.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output available: {0}")]
    Stream(#[from] rodio::StreamError),

    #[error("failed to create audio sink: {0}")]
    Play(#[from] rodio::PlayError),
}
