//! Persisted app preferences.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use media_capture_core::AudioFormat;

/// Highest playback volume step.
pub const MAX_VOLUME: u8 = 15;

const SETTINGS_FILE: &str = "settings.json";

/// User preferences stored as pretty JSON in the config directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub dark_mode: bool,
    pub volume: u8,
    pub recordings_dir: Option<PathBuf>,
    pub format: AudioFormat,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            volume: MAX_VOLUME / 2,
            recordings_dir: None,
            format: AudioFormat::cd_mono(),
        }
    }
}

impl AppSettings {
    /// Default settings file location: `<config_dir>/mediamix/settings.json`.
    pub fn default_path() -> PathBuf {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mediamix")
            .join(SETTINGS_FILE)
    }

    /// Load settings, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        let settings: Self =
            serde_json::from_str(&json).with_context(|| format!("invalid settings in {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        check_volume(self.volume)?;
        self.format.validate()?;
        Ok(())
    }

    pub fn set_volume(&mut self, volume: u8) -> Result<()> {
        check_volume(volume)?;
        self.volume = volume;
        Ok(())
    }

    /// Where recordings are stored: the configured directory, else
    /// `<documents>/MediaMix Recordings`.
    pub fn recordings_dir(&self) -> PathBuf {
        self.recordings_dir.clone().unwrap_or_else(|| {
            dirs_next::document_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("MediaMix Recordings")
        })
    }
}

fn check_volume(volume: u8) -> Result<()> {
    if volume > MAX_VOLUME {
        bail!("volume must be between 0 and {}, got {}", MAX_VOLUME, volume);
    }
    Ok(())
}
