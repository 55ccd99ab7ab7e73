//! Player configuration.
//!
//! Points the player at its assets and catalog and carries the audio
//! layer's own settings in an `[audio]` table. Relative paths are taken
//! relative to the directory holding the configuration file.

use serde::{Deserialize, Serialize};
use sfx2d_kernel::AudioConfig;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Player configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Directory scanned for audio files
    pub asset_root: PathBuf,
    /// Catalog manifest (TOML)
    pub catalog: PathBuf,
    /// Ticks per second
    pub target_fps: u32,
    /// Seconds after which playback is stopped even if sounds loop
    pub idle_exit_secs: f32,
    /// Audio layer settings
    pub audio: AudioConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            catalog: PathBuf::from("assets/catalog.toml"),
            target_fps: 60,
            idle_exit_secs: 30.0,
            audio: AudioConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Load configuration from a path, falling back to defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let mut config = match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse config file: {e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read config file: {e}");
                Self::default()
            },
        };

        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        config.validate();
        config
    }

    /// Save configuration to a path.
    #[allow(dead_code)]
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Resolve relative paths against `base`.
    fn rebase(&mut self, base: &Path) {
        if self.asset_root.is_relative() {
            self.asset_root = base.join(&self.asset_root);
        }
        if self.catalog.is_relative() {
            self.catalog = base.join(&self.catalog);
        }
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.target_fps = self.target_fps.clamp(10, 240);
        if !self.idle_exit_secs.is_finite() {
            self.idle_exit_secs = Self::default().idle_exit_secs;
        }
        self.idle_exit_secs = self.idle_exit_secs.max(0.0);
        self.audio.validate();
    }
}
