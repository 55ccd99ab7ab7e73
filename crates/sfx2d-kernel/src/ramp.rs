//! Timed volume ramps for fades.
//!
//! The ramper only does the arithmetic: each tick it reports the volume
//! every ramping voice should have, and which ramps just finished. The
//! caller applies the values to devices and acts on the ramp's
//! [`RampEnd`] when it completes.

use std::collections::HashMap;

use sfx2d_common::AssetHandle;

use crate::voice::VoiceId;

/// What happens to a voice when its ramp completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RampEnd {
    /// Keep playing at the final volume.
    Hold,
    /// Stop the voice, unless it has been reassigned to another asset
    /// since the ramp began.
    StopIfAssigned(AssetHandle),
    /// Drop the voice's remembered pre-mute volume.
    ForgetMuted,
}

/// A volume ramp on one voice.
#[derive(Debug, Clone, PartialEq)]
pub struct Ramp {
    /// Voice being ramped.
    pub voice: VoiceId,
    /// Starting volume.
    pub from: f32,
    /// Final volume.
    pub to: f32,
    /// Duration in seconds.
    pub duration: f32,
    /// Action on completion.
    pub end: RampEnd,
}

impl Ramp {
    /// Creates a ramp that holds its final volume.
    #[must_use]
    pub fn new(voice: VoiceId, from: f32, to: f32, duration: f32) -> Self {
        Self {
            voice,
            from,
            to,
            duration,
            end: RampEnd::Hold,
        }
    }

    /// Sets the completion action.
    #[must_use]
    pub fn ending(mut self, end: RampEnd) -> Self {
        self.end = end;
        self
    }
}

/// Volume to apply to a voice this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RampStep {
    /// Voice to update.
    pub voice: VoiceId,
    /// Volume to set.
    pub volume: f32,
    /// Set on the step that completes the ramp.
    pub finished: Option<RampEnd>,
}

/// Drives volume ramps from the tick.
pub trait VolumeRamper {
    /// Starts a ramp, replacing any ramp already running on the voice.
    fn start(&mut self, ramp: Ramp);

    /// Drops the voice's ramp without completing it.
    fn cancel(&mut self, voice: VoiceId);

    /// Whether the voice has a ramp running.
    fn is_ramping(&self, voice: VoiceId) -> bool;

    /// Completion action of the voice's running ramp.
    fn ending(&self, voice: VoiceId) -> Option<&RampEnd>;

    /// Advances every ramp by `delta` seconds.
    ///
    /// Completed ramps report exactly their target volume and are removed.
    fn advance(&mut self, delta: f32) -> Vec<RampStep>;
}

#[derive(Debug, Clone)]
struct ActiveRamp {
    ramp: Ramp,
    /// Progress (0.0 - 1.0).
    progress: f32,
}

impl ActiveRamp {
    fn current_volume(&self) -> f32 {
        self.ramp.from + (self.ramp.to - self.ramp.from) * self.progress
    }
}

/// Linear interpolation ramper.
#[derive(Debug, Default)]
pub struct LinearRamper {
    ramps: HashMap<VoiceId, ActiveRamp>,
}

impl LinearRamper {
    /// Create an idle ramper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ramps running.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ramps.len()
    }

    /// Returns true if nothing is ramping.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ramps.is_empty()
    }
}

impl VolumeRamper for LinearRamper {
    fn start(&mut self, ramp: Ramp) {
        self.ramps.insert(
            ramp.voice,
            ActiveRamp {
                ramp,
                progress: 0.0,
            },
        );
    }

    fn cancel(&mut self, voice: VoiceId) {
        self.ramps.remove(&voice);
    }

    fn is_ramping(&self, voice: VoiceId) -> bool {
        self.ramps.contains_key(&voice)
    }

    fn ending(&self, voice: VoiceId) -> Option<&RampEnd> {
        self.ramps.get(&voice).map(|active| &active.ramp.end)
    }

    fn advance(&mut self, delta: f32) -> Vec<RampStep> {
        let delta = delta.max(0.0);
        let mut steps = Vec::with_capacity(self.ramps.len());
        let mut done = Vec::new();

        for (voice, active) in &mut self.ramps {
            if active.ramp.duration <= 0.0 {
                active.progress = 1.0;
            } else {
                active.progress = (active.progress + delta / active.ramp.duration).min(1.0);
            }

            if active.progress >= 1.0 {
                steps.push(RampStep {
                    voice: *voice,
                    volume: active.ramp.to,
                    finished: Some(active.ramp.end.clone()),
                });
                done.push(*voice);
            } else {
                steps.push(RampStep {
                    voice: *voice,
                    volume: active.current_volume(),
                    finished: None,
                });
            }
        }

        for voice in done {
            self.ramps.remove(&voice);
        }

        // Stable order for callers and tests.
        steps.sort_by_key(|step| step.voice);
        steps
    }
}
