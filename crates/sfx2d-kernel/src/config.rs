//! Audio layer configuration.
//!
//! Loaded from TOML; every field has a default so partial files work.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::pool::DEFAULT_GROWTH_WARNING;
use crate::reaper::DEFAULT_FREE_TIMEOUT_SECS;

/// Tunables for [`AudioManager`](crate::manager::AudioManager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Seconds an asset must stay idle before it is released
    pub free_asset_timeout_secs: f32,
    /// Voices created up front
    pub prewarm_voices: usize,
    /// Pool size above which each growth logs a warning
    pub pool_growth_warning: usize,
    /// Run fades over time; when false every fade is instantaneous
    pub fades_enabled: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            free_asset_timeout_secs: DEFAULT_FREE_TIMEOUT_SECS,
            prewarm_voices: 0,
            pool_growth_warning: DEFAULT_GROWTH_WARNING,
            fades_enabled: true,
        }
    }
}

impl AudioConfig {
    /// Load configuration from a path, falling back to defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Audio config not found at {}, using defaults", path.display());
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read audio config: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded audio config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse audio config: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved audio config to {}", path.display());
        Ok(())
    }

    /// Clamp values to sensible ranges.
    pub fn validate(&mut self) {
        if !self.free_asset_timeout_secs.is_finite() {
            self.free_asset_timeout_secs = DEFAULT_FREE_TIMEOUT_SECS;
        }
        self.free_asset_timeout_secs = self.free_asset_timeout_secs.max(0.0);
        self.pool_growth_warning = self.pool_growth_warning.max(1);
    }
}
