//! Playback coordinator.
//!
//! [`AudioManager`] ties the layer together. A play request resolves its
//! name in the catalog, cancels any pending release of the asset, asks the
//! loader for the clip and, once the clip arrives, takes a voice from the
//! pool and starts it:
//!
//! ```text
//! play_audio ─► catalog.resolve ─► reaper.mark_in_use ─► loader.ensure_loaded
//!                                                            │ (now or on poll)
//!                                                            ▼
//!                               voice.play ◄─ pool.acquire ◄─ clip
//! ```
//!
//! Everything runs on the thread that calls the manager. `tick` drives the
//! rest: loader completions, fades, reclamation of finished voices and
//! release of assets that stayed idle past the timeout.
//!
//! Playback operations never return errors. A missing name, a failed load
//! or an unavailable device is logged and the sound simply does not play.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use sfx2d_common::{AssetHandle, AudioError, AudioReference, AudioResult, BusId};
use tracing::{debug, error, info, warn};

use crate::catalog::AudioCatalog;
use crate::clip::AudioClip;
use crate::config::AudioConfig;
use crate::loader::AssetLoader;
use crate::pool::VoicePool;
use crate::ramp::{LinearRamper, Ramp, RampEnd, VolumeRamper};
use crate::reaper::FreeAssetReaper;
use crate::voice::{DeviceFactory, VoiceId};
use crate::volume::{linear_to_db, BusLevels, BusMixer, PlayOptions};

/// Snapshot of the manager's state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
    /// Voices in the pool.
    pub voices: usize,
    /// Voices currently taken.
    pub busy_voices: usize,
    /// Assets waiting out the idle timeout.
    pub pending_releases: usize,
    /// Distinct assets the loader is still fetching.
    pub loads_in_flight: usize,
    /// Play requests waiting for their clip.
    pub plays_waiting: usize,
    /// Whether mute is on.
    pub muted: bool,
}

/// State touched from load completions.
///
/// Shared with the callbacks handed to the loader, which may run inside
/// `ensure_loaded` or later inside `poll`. It is never borrowed across a
/// loader call or a caller's callback.
struct Playback {
    pool: VoicePool,
    reaper: FreeAssetReaper,
    ramper: Option<Box<dyn VolumeRamper>>,
    muted: bool,
    /// Pre-mute volume per voice, kept until the unmute completes.
    remembered: HashMap<VoiceId, f32>,
    plays_waiting: usize,
}

impl Playback {
    /// Takes a voice and starts `clip` on it.
    fn start_voice(&mut self, name: &str, clip: AudioClip, bus: BusId, options: PlayOptions) {
        let id = match self.pool.acquire() {
            Ok(id) => id,
            Err(e) => {
                warn!("No voice for '{}': {}", name, e);
                return;
            },
        };

        if let Some(ramper) = self.ramper.as_mut() {
            ramper.cancel(id);
        }
        self.remembered.remove(&id);
        self.reaper.mark_in_use(name);

        let Some(voice) = self.pool.voice_mut(id) else {
            return;
        };
        voice.assign(clip, bus, options.looping, options.pitch, options.volume);

        let fade_in = options.fade_in > 0.0 && self.ramper.is_some();
        let initial = if self.muted || fade_in {
            0.0
        } else {
            options.volume
        };
        voice.device_mut().set_volume(initial);
        voice.device_mut().play();

        if self.muted {
            self.remembered.insert(id, options.volume);
        } else if let (true, Some(ramper)) = (fade_in, self.ramper.as_mut()) {
            ramper.start(Ramp::new(id, 0.0, options.volume, options.fade_in));
        }

        debug!("Playing '{}' on voice {}", name, id.index());
    }

    /// Applies this tick's ramp steps to the devices.
    fn advance_ramps(&mut self, delta: f32) {
        let Some(ramper) = self.ramper.as_mut() else {
            return;
        };

        for step in ramper.advance(delta) {
            let Some(voice) = self.pool.voice_mut(step.voice) else {
                continue;
            };

            match step.finished {
                Some(RampEnd::StopIfAssigned(asset)) => {
                    if voice.is_assigned_to(&asset) {
                        voice.device_mut().set_volume(step.volume);
                        voice.device_mut().stop();
                    }
                },
                Some(RampEnd::ForgetMuted) => {
                    voice.device_mut().set_volume(step.volume);
                    self.remembered.remove(&step.voice);
                },
                Some(RampEnd::Hold) | None => voice.device_mut().set_volume(step.volume),
            }
        }
    }

    /// Ramps or sets a voice's volume. Instant when `fade` is zero or no
    /// ramper is installed; in that case `end` is not applied.
    fn fade_voice(&mut self, id: VoiceId, to: f32, fade: f32, end: RampEnd) -> bool {
        let Some(voice) = self.pool.voice_mut(id) else {
            return false;
        };

        match self.ramper.as_mut() {
            Some(ramper) if fade > 0.0 => {
                let from = voice.device().volume();
                ramper.start(Ramp::new(id, from, to, fade).ending(end));
                true
            },
            ramper => {
                if let Some(ramper) = ramper {
                    ramper.cancel(id);
                }
                voice.device_mut().set_volume(to);
                false
            },
        }
    }

    fn is_fading_to_stop(&self, id: VoiceId) -> bool {
        self.ramper
            .as_ref()
            .and_then(|r| r.ending(id))
            .is_some_and(|end| matches!(end, RampEnd::StopIfAssigned(_)))
    }
}

/// The sound-effect playback coordinator.
pub struct AudioManager {
    catalog: AudioCatalog,
    /// Kept outside `playback`: completions may run inside loader calls.
    loader: Box<dyn AssetLoader>,
    playback: Rc<RefCell<Playback>>,
    mixer: Option<Box<dyn BusMixer>>,
    bus_levels: BusLevels,
    config: AudioConfig,
}

impl std::fmt::Debug for AudioManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioManager")
            .field("sounds", &self.catalog.len())
            .field("stats", &self.stats())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AudioManager {
    /// Builds a manager and prewarms the voice pool.
    ///
    /// A linear ramper is installed unless `config.fades_enabled` is false.
    pub fn new(
        catalog: AudioCatalog,
        loader: Box<dyn AssetLoader>,
        factory: Box<dyn DeviceFactory>,
        mut config: AudioConfig,
    ) -> AudioResult<Self> {
        config.validate();

        let mut pool = VoicePool::new(factory).with_growth_warning(config.pool_growth_warning);
        pool.prewarm(config.prewarm_voices)?;

        let ramper: Option<Box<dyn VolumeRamper>> = if config.fades_enabled {
            Some(Box::new(LinearRamper::new()))
        } else {
            None
        };

        info!(
            "Audio manager ready: {} sounds, {} voices prewarmed",
            catalog.len(),
            pool.len()
        );

        Ok(Self {
            catalog,
            loader,
            playback: Rc::new(RefCell::new(Playback {
                pool,
                reaper: FreeAssetReaper::new(config.free_asset_timeout_secs),
                ramper,
                muted: false,
                remembered: HashMap::new(),
                plays_waiting: 0,
            })),
            mixer: None,
            bus_levels: BusLevels::new(),
            config,
        })
    }

    /// Replaces the volume ramper; `None` makes every fade instantaneous.
    #[must_use]
    pub fn with_ramper(self, ramper: Option<Box<dyn VolumeRamper>>) -> Self {
        self.playback.borrow_mut().ramper = ramper;
        self
    }

    /// Installs a mixer that receives bus levels.
    #[must_use]
    pub fn with_mixer(mut self, mixer: Box<dyn BusMixer>) -> Self {
        self.mixer = Some(mixer);
        self
    }

    /// The catalog.
    #[must_use]
    pub fn catalog(&self) -> &AudioCatalog {
        &self.catalog
    }

    /// The asset loader.
    #[must_use]
    pub fn loader(&self) -> &dyn AssetLoader {
        self.loader.as_ref()
    }

    /// The effective configuration.
    #[must_use]
    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Whether the asset system has finished initializing.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.loader.is_initialized()
    }

    /// Whether mute is on.
    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.playback.borrow().muted
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> ManagerStats {
        let playback = self.playback.borrow();
        ManagerStats {
            voices: playback.pool.len(),
            busy_voices: playback.pool.busy_count(),
            pending_releases: playback.reaper.len(),
            loads_in_flight: self.loader.loads_in_flight(),
            plays_waiting: playback.plays_waiting,
            muted: playback.muted,
        }
    }

    fn resolve(&self, reference: &AudioReference) -> Option<(AssetHandle, BusId)> {
        match self.catalog.resolve(reference.name()) {
            Ok((asset, bus)) => Some((asset.clone(), bus.clone())),
            Err(e) => {
                warn!("{}", e);
                None
            },
        }
    }

    /// Whether the sound could play right now without a load error.
    ///
    /// Checks that the asset is known to the asset system; it does not have
    /// to be resident.
    pub fn is_audio_available(&self, reference: &AudioReference) -> bool {
        if !self.loader.is_initialized() {
            error!("{} (queried '{}')", AudioError::NotInitialized, reference);
            return false;
        }

        match self.resolve(reference) {
            Some((asset, _)) => self.loader.is_available(&asset),
            None => false,
        }
    }

    /// Plays a sound with default options.
    pub fn play_audio_once(&mut self, reference: &AudioReference) {
        self.play_audio(reference, PlayOptions::default());
    }

    /// Plays a sound.
    ///
    /// Starts immediately when the clip is resident, otherwise once the
    /// loader delivers it.
    pub fn play_audio(&mut self, reference: &AudioReference, options: PlayOptions) {
        let options = options.normalized();
        let Some((asset, bus)) = self.resolve(reference) else {
            return;
        };

        {
            let mut playback = self.playback.borrow_mut();
            playback.reaper.mark_in_use(reference.name());
            playback.plays_waiting += 1;
        }

        let playback = Rc::clone(&self.playback);
        let name = reference.name().to_string();
        self.loader.ensure_loaded(
            &asset,
            Box::new(move |result| {
                let mut playback = playback.borrow_mut();
                playback.plays_waiting = playback.plays_waiting.saturating_sub(1);

                match result {
                    Ok(clip) => playback.start_voice(&name, clip, bus, options),
                    Err(e) => warn!("{}; '{}' will not play", e, name),
                }
            }),
        );
    }

    /// Stops every voice playing the sound, optionally fading out first.
    ///
    /// Does nothing if the sound is not playing.
    pub fn stop_audio(&mut self, reference: &AudioReference, fade_secs: f32) {
        let Some((asset, _)) = self.resolve(reference) else {
            return;
        };

        let mut playback = self.playback.borrow_mut();
        let voices: Vec<VoiceId> = playback
            .pool
            .find_voices_playing(&asset)
            .into_iter()
            .filter(|&id| playback.pool.voice(id).is_some_and(|v| v.is_playing()))
            .collect();

        if voices.is_empty() {
            debug!("Stop '{}': nothing playing", reference);
            return;
        }

        let ramped = fade_secs > 0.0 && playback.ramper.is_some();
        for id in voices {
            // A stopping voice has nothing for unmute to restore.
            playback.remembered.remove(&id);
            if ramped {
                playback.fade_voice(id, 0.0, fade_secs, RampEnd::StopIfAssigned(asset.clone()));
                continue;
            }
            if let Some(ramper) = playback.ramper.as_mut() {
                ramper.cancel(id);
            }
            if let Some(voice) = playback.pool.voice_mut(id) {
                voice.device_mut().stop();
            }
        }
    }

    /// Asks whether any voice is playing the sound.
    ///
    /// The answer may need the clip to be loaded, so it arrives through
    /// `on_result`: immediately when resident, otherwise after a `tick`.
    /// If no voice uses the asset afterwards it is marked free, so a load
    /// forced by the query alone is released later.
    pub fn is_audio_playing(&mut self, reference: &AudioReference, on_result: impl FnOnce(bool) + 'static) {
        let Some((asset, _)) = self.resolve(reference) else {
            on_result(false);
            return;
        };

        let playback = Rc::clone(&self.playback);
        let name = reference.name().to_string();
        self.loader.ensure_loaded(
            &asset,
            Box::new(move |result| {
                let playing = match result {
                    Ok(clip) => {
                        let mut playback = playback.borrow_mut();
                        let playing = playback
                            .pool
                            .find_voices_playing(&clip.handle)
                            .into_iter()
                            .any(|id| playback.pool.voice(id).is_some_and(|v| v.is_playing()));

                        if !playback.pool.has_busy_voice_for(&clip.handle) {
                            playback.reaper.mark_free(&name);
                        }
                        playing
                    },
                    Err(e) => {
                        warn!("{}", e);
                        false
                    },
                };
                on_result(playing);
            }),
        );
    }

    /// Silences every busy voice, remembering its volume for `unmute_all`.
    ///
    /// Voices fading out to stop are left alone. Does nothing when already
    /// muted.
    pub fn mute_all(&mut self, fade_secs: f32) {
        let mut playback = self.playback.borrow_mut();
        if playback.muted {
            debug!("Already muted");
            return;
        }
        playback.muted = true;

        for id in playback.pool.busy_voices() {
            if playback.is_fading_to_stop(id) {
                continue;
            }
            let Some(requested) = playback.pool.voice(id).map(|v| v.requested_volume()) else {
                continue;
            };
            playback.remembered.insert(id, requested);
            playback.fade_voice(id, 0.0, fade_secs, RampEnd::Hold);
        }

        info!("Muted {} voices", playback.remembered.len());
    }

    /// Restores the volumes remembered by `mute_all`.
    ///
    /// Voices fading out to stop keep fading.
    pub fn unmute_all(&mut self, fade_secs: f32) {
        let mut playback = self.playback.borrow_mut();
        if !playback.muted {
            debug!("Not muted");
            return;
        }
        playback.muted = false;

        let mut restore: Vec<(VoiceId, f32)> = playback.remembered.iter().map(|(&id, &v)| (id, v)).collect();
        restore.sort_by_key(|(id, _)| *id);

        for (id, volume) in restore {
            let busy = playback.pool.voice(id).is_some_and(|v| v.is_busy());
            if !busy || playback.is_fading_to_stop(id) {
                playback.remembered.remove(&id);
                continue;
            }
            if !playback.fade_voice(id, volume, fade_secs, RampEnd::ForgetMuted) {
                playback.remembered.remove(&id);
            }
        }

        info!("Unmuted");
    }

    /// Stops every voice. Voices are freed on the next `tick`.
    pub fn stop_all(&mut self) {
        let mut playback = self.playback.borrow_mut();
        let busy = playback.pool.busy_voices();
        if let Some(ramper) = playback.ramper.as_mut() {
            for &id in &busy {
                ramper.cancel(id);
            }
        }
        playback.pool.stop_all();
        debug!("Stopped all voices ({} busy)", busy.len());
    }

    /// Sets a bus's linear level and forwards it to the mixer in decibels.
    pub fn set_bus_volume(&mut self, bus: &BusId, level: f32) {
        let level = self.bus_levels.set(bus, level);
        if let Some(mixer) = self.mixer.as_mut() {
            mixer.set_bus_attenuation_db(bus, linear_to_db(level));
        }

        // Devices pick up the new bus gain when their volume is re-applied.
        let mut playback = self.playback.borrow_mut();
        for id in playback.pool.busy_voices() {
            let Some(voice) = playback.pool.voice_mut(id) else {
                continue;
            };
            let on_bus = voice
                .asset()
                .and_then(|asset| self.catalog.bus_of(asset))
                .is_some_and(|b| b == bus);
            if on_bus {
                let volume = voice.device().volume();
                voice.device_mut().set_volume(volume);
            }
        }
    }

    /// A bus's linear level; 1.0 unless set.
    #[must_use]
    pub fn bus_volume(&self, bus: &BusId) -> f32 {
        self.bus_levels.get(bus)
    }

    /// Advances the layer by `delta` seconds. Call once per frame.
    pub fn tick(&mut self, delta: f32) {
        self.loader.poll();

        let expired = {
            let mut playback = self.playback.borrow_mut();
            let playback = &mut *playback;

            playback.advance_ramps(delta);

            let reclaimed = playback.pool.reclaim_finished();
            for id in &reclaimed.voices {
                if let Some(ramper) = playback.ramper.as_mut() {
                    ramper.cancel(*id);
                }
                playback.remembered.remove(id);
            }
            for asset in &reclaimed.idle_assets {
                match self.catalog.name_of(asset) {
                    Some(name) => playback.reaper.mark_free(name),
                    None => debug!("Idle asset {} is not in the catalog", asset),
                }
            }

            let mut names = Vec::new();
            playback
                .reaper
                .tick(delta, |name| names.push(name.to_string()));

            let mut expired = Vec::with_capacity(names.len());
            for name in names {
                let Ok((asset, _)) = self.catalog.resolve(&name) else {
                    continue;
                };
                if playback.pool.has_busy_voice_for(asset) {
                    debug!("Skipping release of '{}': still in use", name);
                    continue;
                }
                expired.push(asset.clone());
            }
            expired
        };

        for asset in expired {
            self.loader.release(&asset);
        }
    }
}
