use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tempo::Tempo;
use crate::time_signature::TimeSignature;
use crate::utilities::sound_type::SoundType;

const APP_DIR: &str = "metronome";

/// User settings persisted as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bpm: Tempo,
    pub time_signature: TimeSignature,
    pub regular_sound: SoundType,
    pub first_beat_sound: SoundType,
    /// 0-100
    pub volume: u32,
    /// How long the beat indicator stays lit.
    pub flash_ms: u64,
    pub autostart: bool,
    pub database_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bpm: Tempo::default(),
            time_signature: TimeSignature::default(),
            regular_sound: SoundType::Click,
            first_beat_sound: SoundType::Cowbell,
            volume: 80,
            flash_ms: 100,
            autostart: true,
            database_path: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.volume > 100 {
            return Err(ConfigError::Invalid(format!(
                "volume {} is above 100",
                self.volume
            )));
        }
        if self.flash_ms == 0 {
            return Err(ConfigError::Invalid("flash_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// The playlist database, falling back to the per-user data directory.
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("playlists.db")
        })
    }
}

/// Where logs go while the terminal UI owns the screen.
pub fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("metronome.log")
}

/// Opens `path` for appending, creating missing parent directories.
pub fn open_log_file(path: &Path) -> Result<File, ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Loads and saves [`Settings`] at a fixed path.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Uses `config_path`, or `<config dir>/metronome/config.json` when `None`.
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(Self::default_path);
        Self {
            config_path,
            settings: Settings::default(),
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Reads the settings file, writing the defaults first if there is none.
    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            info!("no config at {}, writing defaults", self.config_path.display());
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        settings.validate()?;
        debug!("loaded config from {}", self.config_path.display());

        self.settings = settings;
        Ok(self.settings.clone())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.config_path, content)?;
        Ok(())
    }

    pub fn update(&mut self, settings: Settings) -> Result<(), ConfigError> {
        settings.validate()?;
        self.settings = settings;
        self.save()
    }
}
