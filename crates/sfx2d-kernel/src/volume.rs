//! Volume scales, play options and bus levels.
//!
//! Per-voice volume is linear in `[0, 1]`. Bus levels are stored linear as
//! well but handed to the mixer in decibels, where a perceptual scale
//! makes mixer-wide fades sound even.

use std::collections::HashMap;

use sfx2d_common::BusId;

/// Floor applied before taking a logarithm; maps to -80 dB.
pub const MIN_LINEAR: f32 = 0.0001;

/// Pitch range accepted by playback devices.
pub const PITCH_RANGE: (f32, f32) = (0.1, 4.0);

/// Converts a linear level to decibels: `20 * log10(clamp(l, 0.0001, 1))`.
#[must_use]
pub fn linear_to_db(linear: f32) -> f32 {
    20.0 * linear.clamp(MIN_LINEAR, 1.0).log10()
}

/// Converts decibels to a linear level: `10^(dB / 20)`.
#[must_use]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Parameters of a single play request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    /// Loop until stopped.
    pub looping: bool,
    /// Pitch multiplier (1.0 = normal).
    pub pitch: f32,
    /// Linear volume (0.0 - 1.0).
    pub volume: f32,
    /// Fade-in duration in seconds; 0 starts at full volume.
    pub fade_in: f32,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            looping: false,
            pitch: 1.0,
            volume: 1.0,
            fade_in: 0.0,
        }
    }
}

impl PlayOptions {
    /// Sets looping.
    #[must_use]
    pub const fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Sets the pitch multiplier.
    #[must_use]
    pub const fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    /// Sets the volume.
    #[must_use]
    pub const fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Sets the fade-in duration.
    #[must_use]
    pub const fn with_fade_in(mut self, seconds: f32) -> Self {
        self.fade_in = seconds;
        self
    }

    /// Clamp values to valid ranges. NaN falls back to the default.
    pub fn normalize(&mut self) {
        let defaults = Self::default();
        self.volume = finite_or(self.volume, defaults.volume).clamp(0.0, 1.0);
        self.pitch = finite_or(self.pitch, defaults.pitch).clamp(PITCH_RANGE.0, PITCH_RANGE.1);
        self.fade_in = finite_or(self.fade_in, defaults.fade_in).max(0.0);
    }

    /// Normalized copy.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Mixer collaborator that receives bus attenuation in decibels.
pub trait BusMixer {
    /// Sets a bus's attenuation.
    fn set_bus_attenuation_db(&mut self, bus: &BusId, db: f32);
}

/// Linear level per bus. Unknown buses are at full level.
#[derive(Debug, Clone, Default)]
pub struct BusLevels {
    levels: HashMap<BusId, f32>,
}

impl BusLevels {
    /// Create with every bus at full level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a bus's linear level.
    #[must_use]
    pub fn get(&self, bus: &BusId) -> f32 {
        self.levels.get(bus).copied().unwrap_or(1.0)
    }

    /// Set a bus's linear level, clamped to `[0, 1]`. Returns the stored value.
    pub fn set(&mut self, bus: &BusId, level: f32) -> f32 {
        let level = finite_or(level, 1.0).clamp(0.0, 1.0);
        self.levels.insert(bus.clone(), level);
        level
    }

    /// Buses with an explicit level.
    pub fn iter(&self) -> impl Iterator<Item = (&BusId, f32)> {
        self.levels.iter().map(|(bus, level)| (bus, *level))
    }
}
