//! Test doubles shared by the kernel's unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use sfx2d_common::{AssetHandle, AudioError, AudioResult, BusId};

use crate::clip::AudioClip;
use crate::loader::{AssetLoader, LoadCallback, LoaderStats, PendingLoads};
use crate::voice::{DeviceFactory, PlaybackDevice};

/// Builds a 16-bit PCM WAV file with a quiet ramp so decoders see real data.
pub fn wav_bytes(frames: u32, sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let data_size = frames * u32::from(channels) * u32::from(bits_per_sample / 8);

    let mut wav = Vec::with_capacity(44 + data_size as usize);

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_size).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    let byte_rate = sample_rate * u32::from(channels) * u32::from(bits_per_sample / 8);
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    let block_align = channels * (bits_per_sample / 8);
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());

    for frame in 0..frames {
        let sample = ((frame % 64) as i16 - 32) * 16;
        for _ in 0..channels {
            wav.extend_from_slice(&sample.to_le_bytes());
        }
    }

    wav
}

/// A short mono clip for the given key.
pub fn clip(key: &str) -> AudioClip {
    AudioClip::new(AssetHandle::new(key), vec![0.0; 64], 8000, 1)
}

/// Everything a [`MockDevice`] has been told.
#[derive(Debug, Clone, Default)]
pub struct DeviceLog {
    pub clip: Option<AssetHandle>,
    pub bus: Option<BusId>,
    pub looping: bool,
    pub pitch: f32,
    pub volume: f32,
    pub volumes: Vec<f32>,
    pub playing: bool,
    pub plays: u32,
    pub stops: u32,
}

type SharedLog = Arc<Mutex<DeviceLog>>;

/// Device that records calls and plays until told to finish.
#[derive(Debug)]
pub struct MockDevice {
    log: SharedLog,
}

impl PlaybackDevice for MockDevice {
    fn set_clip(&mut self, clip: Option<AudioClip>) {
        self.log.lock().clip = clip.map(|c| c.handle);
    }

    fn set_bus(&mut self, bus: Option<BusId>) {
        self.log.lock().bus = bus;
    }

    fn set_loop(&mut self, looping: bool) {
        self.log.lock().looping = looping;
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.log.lock().pitch = pitch;
    }

    fn set_volume(&mut self, volume: f32) {
        let mut log = self.log.lock();
        log.volume = volume;
        log.volumes.push(volume);
    }

    fn volume(&self) -> f32 {
        self.log.lock().volume
    }

    fn play(&mut self) {
        let mut log = self.log.lock();
        log.playing = true;
        log.plays += 1;
    }

    fn stop(&mut self) {
        let mut log = self.log.lock();
        log.playing = false;
        log.stops += 1;
    }

    fn is_playing(&self) -> bool {
        self.log.lock().playing
    }
}

/// Factory for [`MockDevice`]s.
#[derive(Debug)]
pub struct MockFactory {
    logs: Arc<Mutex<Vec<SharedLog>>>,
    fail: bool,
}

impl MockFactory {
    /// A factory plus a monitor of every device it creates.
    pub fn new() -> (Self, DeviceMonitor) {
        let logs = Arc::new(Mutex::new(Vec::new()));
        let devices = DeviceMonitor {
            logs: Arc::clone(&logs),
        };
        (Self { logs, fail: false }, devices)
    }

    /// A factory whose every creation fails.
    pub fn failing() -> (Self, DeviceMonitor) {
        let (mut factory, devices) = Self::new();
        factory.fail = true;
        (factory, devices)
    }
}

impl DeviceFactory for MockFactory {
    fn create_device(&mut self) -> AudioResult<Box<dyn PlaybackDevice>> {
        if self.fail {
            return Err(AudioError::DeviceUnavailable("mock device refused".into()));
        }
        let log = Arc::new(Mutex::new(DeviceLog {
            pitch: 1.0,
            volume: 1.0,
            ..DeviceLog::default()
        }));
        self.logs.lock().push(Arc::clone(&log));
        Ok(Box::new(MockDevice { log }))
    }
}

/// Test-side view of devices created by a [`MockFactory`].
#[derive(Debug, Clone)]
pub struct DeviceMonitor {
    logs: Arc<Mutex<Vec<SharedLog>>>,
}

impl DeviceMonitor {
    /// Number of devices created.
    pub fn device_count(&self) -> usize {
        self.logs.lock().len()
    }

    /// Snapshot of one device's log.
    pub fn log(&self, index: usize) -> DeviceLog {
        self.logs.lock()[index].lock().clone()
    }

    /// Ends playback on a device as if its clip ran out.
    pub fn finish(&self, index: usize) {
        self.logs.lock()[index].lock().playing = false;
    }

    /// Number of devices currently playing.
    pub fn playing_count(&self) -> usize {
        self.logs.lock().iter().filter(|l| l.lock().playing).count()
    }
}

#[derive(Debug, Default)]
struct DeferredShared {
    clips: HashMap<AssetHandle, AudioClip>,
    staged: Vec<(AssetHandle, bool)>,
    started: Vec<AssetHandle>,
    released: Vec<AssetHandle>,
    initialized: bool,
}

/// Loader whose loads finish only when the test says so.
///
/// Finished loads are delivered on the next `poll`, like a real
/// background loader.
#[derive(Debug)]
pub struct DeferredLoader {
    shared: Arc<Mutex<DeferredShared>>,
    resident: HashSet<AssetHandle>,
    pending: PendingLoads,
    stats: LoaderStats,
}

impl DeferredLoader {
    /// A loader knowing the given keys, plus its control handle.
    pub fn new(keys: &[&str]) -> (Self, LoadControl) {
        let clips = keys
            .iter()
            .map(|key| (AssetHandle::new(key), clip(key)))
            .collect();
        let shared = Arc::new(Mutex::new(DeferredShared {
            clips,
            initialized: true,
            ..DeferredShared::default()
        }));
        let control = LoadControl {
            shared: Arc::clone(&shared),
        };
        let loader = Self {
            shared,
            resident: HashSet::new(),
            pending: PendingLoads::new(),
            stats: LoaderStats::default(),
        };
        (loader, control)
    }
}

impl AssetLoader for DeferredLoader {
    fn ensure_loaded(&mut self, handle: &AssetHandle, on_complete: LoadCallback) {
        if self.resident.contains(handle) {
            self.stats.cache_hits += 1;
            let clip = self.shared.lock().clips.get(handle).cloned();
            match clip {
                Some(clip) => on_complete(Ok(clip)),
                None => on_complete(Err(AudioError::load_failed(handle, "vanished"))),
            }
            return;
        }

        if self.pending.enqueue(handle, on_complete) {
            self.stats.loads_started += 1;
            self.shared.lock().started.push(handle.clone());
        } else {
            self.stats.joined_in_flight += 1;
        }
    }

    fn release(&mut self, handle: &AssetHandle) {
        if self.resident.remove(handle) {
            self.stats.releases += 1;
            self.shared.lock().released.push(handle.clone());
        }
    }

    fn is_loaded(&self, handle: &AssetHandle) -> bool {
        self.resident.contains(handle)
    }

    fn is_available(&self, handle: &AssetHandle) -> bool {
        self.shared.lock().clips.contains_key(handle)
    }

    fn is_initialized(&self) -> bool {
        self.shared.lock().initialized
    }

    fn poll(&mut self) {
        let staged = std::mem::take(&mut self.shared.lock().staged);

        for (handle, succeed) in staged {
            let clip = self.shared.lock().clips.get(&handle).cloned();
            let result = match clip {
                Some(clip) if succeed => {
                    self.stats.loads_completed += 1;
                    self.resident.insert(handle.clone());
                    Ok(clip)
                },
                _ => {
                    self.stats.loads_failed += 1;
                    Err(AudioError::load_failed(&handle, "load failed"))
                },
            };
            self.pending.complete(&handle, &result);
        }
    }

    fn loads_in_flight(&self) -> usize {
        self.pending.len()
    }

    fn stats(&self) -> &LoaderStats {
        &self.stats
    }
}

/// Test-side control over a [`DeferredLoader`].
#[derive(Debug, Clone)]
pub struct LoadControl {
    shared: Arc<Mutex<DeferredShared>>,
}

impl LoadControl {
    /// Lets a load succeed on the next poll.
    pub fn finish(&self, key: &str) {
        self.shared.lock().staged.push((AssetHandle::new(key), true));
    }

    /// Lets a load fail on the next poll.
    pub fn fail(&self, key: &str) {
        self.shared.lock().staged.push((AssetHandle::new(key), false));
    }

    /// Handles whose underlying load was started, in order.
    pub fn started(&self) -> Vec<AssetHandle> {
        self.shared.lock().started.clone()
    }

    /// Handles released, in order.
    pub fn released(&self) -> Vec<AssetHandle> {
        self.shared.lock().released.clone()
    }

    /// Flips the initialization gate.
    pub fn set_initialized(&self, initialized: bool) {
        self.shared.lock().initialized = initialized;
    }
}
