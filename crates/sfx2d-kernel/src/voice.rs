//! Voices: one playback device plus its pool bookkeeping.

use sfx2d_common::{AssetHandle, AudioResult, BusId};

use crate::clip::AudioClip;

/// The host's playback device for a single voice.
///
/// A device renders at most one clip at a time. `is_playing` turns false
/// when the clip ends on its own or after `stop`.
pub trait PlaybackDevice {
    /// Assigns the clip to play; `None` clears it.
    fn set_clip(&mut self, clip: Option<AudioClip>);
    /// Routes output through a bus; `None` clears the routing.
    fn set_bus(&mut self, bus: Option<BusId>);
    /// Enables or disables looping.
    fn set_loop(&mut self, looping: bool);
    /// Sets the pitch multiplier (affects tempo too).
    fn set_pitch(&mut self, pitch: f32);
    /// Sets the linear volume in `[0, 1]`.
    fn set_volume(&mut self, volume: f32);
    /// Current linear volume.
    fn volume(&self) -> f32;
    /// Starts playing the assigned clip from the beginning.
    fn play(&mut self);
    /// Stops playback.
    fn stop(&mut self);
    /// Whether the device is producing sound.
    fn is_playing(&self) -> bool;
}

/// Creates playback devices for the pool.
pub trait DeviceFactory {
    /// Creates one device. Devices are assumed expensive, so the pool keeps
    /// every device it creates.
    fn create_device(&mut self) -> AudioResult<Box<dyn PlaybackDevice>>;
}

/// Index of a voice in the pool. Stable because the pool never shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(usize);

impl VoiceId {
    /// Create a voice ID from a pool index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the pool index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A pooled voice.
pub struct Voice {
    /// The playback device.
    device: Box<dyn PlaybackDevice>,
    /// Asset currently assigned, if any.
    asset: Option<AssetHandle>,
    /// Whether the voice is taken.
    busy: bool,
    /// Acquired since the last reclamation pass.
    fresh: bool,
    /// Volume requested by the caller, before mute or fades.
    requested_volume: f32,
}

impl std::fmt::Debug for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Voice")
            .field("asset", &self.asset)
            .field("busy", &self.busy)
            .field("fresh", &self.fresh)
            .field("requested_volume", &self.requested_volume)
            .finish_non_exhaustive()
    }
}

impl Voice {
    pub(crate) fn new(device: Box<dyn PlaybackDevice>) -> Self {
        Self {
            device,
            asset: None,
            busy: false,
            fresh: false,
            requested_volume: 1.0,
        }
    }

    /// Asset currently assigned.
    #[must_use]
    pub fn asset(&self) -> Option<&AssetHandle> {
        self.asset.as_ref()
    }

    /// Whether the voice is taken.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Whether the voice was acquired since the last reclamation pass.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Whether the voice is busy with the given asset.
    #[must_use]
    pub fn is_assigned_to(&self, asset: &AssetHandle) -> bool {
        self.busy && self.asset.as_ref() == Some(asset)
    }

    /// Volume the caller asked for.
    #[must_use]
    pub fn requested_volume(&self) -> f32 {
        self.requested_volume
    }

    /// Whether the device is producing sound.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.device.is_playing()
    }

    /// The underlying device.
    #[must_use]
    pub fn device(&self) -> &dyn PlaybackDevice {
        self.device.as_ref()
    }

    /// The underlying device, mutably.
    pub fn device_mut(&mut self) -> &mut dyn PlaybackDevice {
        self.device.as_mut()
    }

    /// Assigns a clip routed through `bus` and records the requested volume.
    ///
    /// Does not start playback.
    pub fn assign(&mut self, clip: AudioClip, bus: BusId, looping: bool, pitch: f32, volume: f32) {
        self.asset = Some(clip.handle.clone());
        self.requested_volume = volume;
        self.device.set_bus(Some(bus));
        self.device.set_clip(Some(clip));
        self.device.set_loop(looping);
        self.device.set_pitch(pitch);
    }

    pub(crate) fn mark_acquired(&mut self) {
        self.busy = true;
        self.fresh = true;
    }

    pub(crate) fn clear_fresh(&mut self) {
        self.fresh = false;
    }

    /// Clears clip, bus and loop state and frees the voice.
    pub(crate) fn release(&mut self) -> Option<AssetHandle> {
        self.device.set_clip(None);
        self.device.set_bus(None);
        self.device.set_loop(false);
        self.busy = false;
        self.fresh = false;
        self.requested_volume = 1.0;
        self.asset.take()
    }
}
