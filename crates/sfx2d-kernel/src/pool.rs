//! Growable pool of playback voices.
//!
//! The pool only ever grows: devices are assumed expensive to create and
//! destroy, so a voice that finishes is cleared and kept for reuse.
//! `acquire` hands out the first free voice in insertion order and only
//! creates a device when every existing voice is busy.
//!
//! Voices are never freed synchronously. A once-per-tick `reclaim_finished`
//! pass frees busy voices whose device has stopped producing sound, and
//! reports which assets no longer back any busy voice.

use sfx2d_common::{AssetHandle, AudioResult};
use tracing::{debug, warn};

use crate::voice::{DeviceFactory, Voice, VoiceId};

/// Default pool size above which growth is logged as a warning.
pub const DEFAULT_GROWTH_WARNING: usize = 64;

/// Outcome of a reclamation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reclaimed {
    /// Voices freed by this pass.
    pub voices: Vec<VoiceId>,
    /// Assets that backed a freed voice and now back no busy voice.
    pub idle_assets: Vec<AssetHandle>,
}

impl Reclaimed {
    /// Returns true if nothing was freed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

/// Pool of voices.
pub struct VoicePool {
    /// Voices in creation order.
    voices: Vec<Voice>,
    /// Creates devices when the pool grows.
    factory: Box<dyn DeviceFactory>,
    /// Pool size above which growth warns.
    growth_warning: usize,
}

impl std::fmt::Debug for VoicePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoicePool")
            .field("voices", &self.voices.len())
            .field("busy", &self.busy_count())
            .field("growth_warning", &self.growth_warning)
            .finish_non_exhaustive()
    }
}

impl VoicePool {
    /// Create an empty pool.
    #[must_use]
    pub fn new(factory: Box<dyn DeviceFactory>) -> Self {
        Self {
            voices: Vec::new(),
            factory,
            growth_warning: DEFAULT_GROWTH_WARNING,
        }
    }

    /// Set the pool size above which growth warns.
    #[must_use]
    pub fn with_growth_warning(mut self, size: usize) -> Self {
        self.growth_warning = size.max(1);
        self
    }

    /// Creates free voices until the pool holds at least `count`.
    pub fn prewarm(&mut self, count: usize) -> AudioResult<()> {
        while self.voices.len() < count {
            self.grow()?;
        }
        debug!("Voice pool prewarmed to {} voices", self.voices.len());
        Ok(())
    }

    /// Takes the first free voice, growing the pool if none is free.
    ///
    /// The voice is busy on return. Fails only if a new device cannot be
    /// created.
    pub fn acquire(&mut self) -> AudioResult<VoiceId> {
        let idx = match self.voices.iter().position(|v| !v.is_busy()) {
            Some(idx) => idx,
            None => self.grow()?,
        };

        self.voices[idx].mark_acquired();
        Ok(VoiceId::new(idx))
    }

    fn grow(&mut self) -> AudioResult<usize> {
        let device = self.factory.create_device()?;
        self.voices.push(Voice::new(device));

        let size = self.voices.len();
        if size > self.growth_warning {
            warn!("Voice pool grew to {} voices", size);
        } else {
            debug!("Voice pool grew to {} voices", size);
        }
        Ok(size - 1)
    }

    /// Get a voice by ID.
    #[must_use]
    pub fn voice(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.get(id.index())
    }

    /// Get a voice by ID, mutably.
    pub fn voice_mut(&mut self, id: VoiceId) -> Option<&mut Voice> {
        self.voices.get_mut(id.index())
    }

    /// Frees busy voices whose playback has ended.
    ///
    /// A voice acquired since the previous pass is skipped once.
    pub fn reclaim_finished(&mut self) -> Reclaimed {
        let mut reclaimed = Reclaimed::default();
        let mut released = Vec::new();

        for (idx, voice) in self.voices.iter_mut().enumerate() {
            if !voice.is_busy() {
                continue;
            }
            if voice.is_fresh() {
                voice.clear_fresh();
                continue;
            }
            if voice.is_playing() {
                continue;
            }

            if let Some(asset) = voice.release() {
                if !released.contains(&asset) {
                    released.push(asset);
                }
            }
            reclaimed.voices.push(VoiceId::new(idx));
        }

        reclaimed.idle_assets = released
            .into_iter()
            .filter(|asset| !self.has_busy_voice_for(asset))
            .collect();

        if !reclaimed.is_empty() {
            debug!(
                "Reclaimed {} voices ({} assets now idle)",
                reclaimed.voices.len(),
                reclaimed.idle_assets.len()
            );
        }
        reclaimed
    }

    /// Stops every voice. Voices stay busy until the next reclamation pass.
    pub fn stop_all(&mut self) {
        for voice in &mut self.voices {
            voice.device_mut().stop();
        }
    }

    /// Busy voices assigned to `asset`.
    #[must_use]
    pub fn find_voices_playing(&self, asset: &AssetHandle) -> Vec<VoiceId> {
        self.voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_assigned_to(asset))
            .map(|(idx, _)| VoiceId::new(idx))
            .collect()
    }

    /// Whether any busy voice is assigned to `asset`.
    #[must_use]
    pub fn has_busy_voice_for(&self, asset: &AssetHandle) -> bool {
        self.voices.iter().any(|v| v.is_assigned_to(asset))
    }

    /// IDs of every busy voice.
    #[must_use]
    pub fn busy_voices(&self) -> Vec<VoiceId> {
        self.voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_busy())
            .map(|(idx, _)| VoiceId::new(idx))
            .collect()
    }

    /// Number of voices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    /// Returns true if no voice has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Number of busy voices.
    #[must_use]
    pub fn busy_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_busy()).count()
    }

    /// Number of free voices.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.voices.len() - self.busy_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::AudioClip;
    use crate::test_support::MockFactory;
    use proptest::prelude::*;
    use sfx2d_common::{AudioError, BusId};

    fn clip(key: &str) -> AudioClip {
        AudioClip::new(AssetHandle::new(key), vec![0.0; 32], 8000, 1)
    }

    fn start(pool: &mut VoicePool, key: &str) -> VoiceId {
        let id = pool.acquire().unwrap();
        let voice = pool.voice_mut(id).unwrap();
        voice.assign(clip(key), BusId::master(), false, 1.0, 1.0);
        voice.device_mut().play();
        id
    }

    #[test]
    fn test_acquire_grows_when_all_busy() {
        let (factory, devices) = MockFactory::new();
        let mut pool = VoicePool::new(Box::new(factory));

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();

        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
        assert_eq!(devices.device_count(), 2);
        assert!(pool.voice(a).unwrap().is_busy());
    }

    #[test]
    fn test_acquire_prefers_first_free_voice() {
        let (factory, devices) = MockFactory::new();
        let mut pool = VoicePool::new(Box::new(factory));
        pool.prewarm(3).unwrap();

        let first = start(&mut pool, "a.wav");
        let second = start(&mut pool, "b.wav");
        assert_eq!(first.index(), 0);
        assert_eq!(second.index(), 1);

        // Both finish; two passes: the first only clears the fresh flag.
        devices.finish(0);
        devices.finish(1);
        pool.reclaim_finished();
        pool.reclaim_finished();

        assert_eq!(pool.acquire().unwrap().index(), 0);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_reclaim_skips_fresh_voice_once() {
        let (factory, devices) = MockFactory::new();
        let mut pool = VoicePool::new(Box::new(factory));
        let id = start(&mut pool, "a.wav");
        devices.finish(0);

        assert!(pool.reclaim_finished().is_empty());
        assert!(pool.voice(id).unwrap().is_busy());

        let reclaimed = pool.reclaim_finished();
        assert_eq!(reclaimed.voices, vec![id]);
        assert_eq!(reclaimed.idle_assets, vec![AssetHandle::new("a.wav")]);
        assert!(!pool.voice(id).unwrap().is_busy());
        assert!(pool.voice(id).unwrap().asset().is_none());
    }

    #[test]
    fn test_reclaim_clears_device_state() {
        let (factory, devices) = MockFactory::new();
        let mut pool = VoicePool::new(Box::new(factory));
        let id = pool.acquire().unwrap();
        let voice = pool.voice_mut(id).unwrap();
        voice.assign(clip("a.wav"), BusId::new("sfx"), true, 1.5, 0.7);
        voice.device_mut().play();

        pool.reclaim_finished();
        devices.finish(0);
        pool.reclaim_finished();

        let log = devices.log(0);
        assert!(log.clip.is_none());
        assert!(log.bus.is_none());
        assert!(!log.looping);
    }

    #[test]
    fn test_asset_not_idle_while_another_voice_plays_it() {
        let (factory, devices) = MockFactory::new();
        let mut pool = VoicePool::new(Box::new(factory));
        start(&mut pool, "a.wav");
        start(&mut pool, "a.wav");
        pool.reclaim_finished();

        devices.finish(0);
        let reclaimed = pool.reclaim_finished();
        assert_eq!(reclaimed.voices.len(), 1);
        assert!(reclaimed.idle_assets.is_empty());

        devices.finish(1);
        let reclaimed = pool.reclaim_finished();
        assert_eq!(reclaimed.idle_assets, vec![AssetHandle::new("a.wav")]);
    }

    #[test]
    fn test_stop_all_frees_on_next_pass() {
        let (factory, devices) = MockFactory::new();
        let mut pool = VoicePool::new(Box::new(factory));
        start(&mut pool, "a.wav");
        start(&mut pool, "b.wav");
        pool.reclaim_finished();

        pool.stop_all();
        assert_eq!(pool.busy_count(), 2);
        assert_eq!(devices.log(0).stops, 1);

        pool.reclaim_finished();
        assert_eq!(pool.busy_count(), 0);
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn test_find_voices_playing() {
        let (factory, _devices) = MockFactory::new();
        let mut pool = VoicePool::new(Box::new(factory));
        let a1 = start(&mut pool, "a.wav");
        start(&mut pool, "b.wav");
        let a2 = start(&mut pool, "a.wav");

        assert_eq!(pool.find_voices_playing(&AssetHandle::new("a.wav")), vec![a1, a2]);
        assert!(pool
            .find_voices_playing(&AssetHandle::new("c.wav"))
            .is_empty());
    }

    #[test]
    fn test_device_failure_propagates() {
        let (factory, _devices) = MockFactory::failing();
        let mut pool = VoicePool::new(Box::new(factory));
        assert!(matches!(
            pool.acquire(),
            Err(AudioError::DeviceUnavailable(_))
        ));
        assert!(pool.is_empty());
    }

    proptest! {
        #[test]
        fn prop_acquire_without_reclaim_grows_to_n(n in 1usize..48) {
            let (factory, _devices) = MockFactory::new();
            let mut pool = VoicePool::new(Box::new(factory));

            let mut seen = std::collections::HashSet::new();
            for _ in 0..n {
                let id = pool.acquire().unwrap();
                prop_assert!(seen.insert(id), "acquire returned a busy voice");
            }
            prop_assert_eq!(pool.len(), n);
            prop_assert_eq!(pool.busy_count(), n);
        }
    }
}
