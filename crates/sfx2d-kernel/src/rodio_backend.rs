//! Playback devices backed by rodio.
//!
//! Each voice owns one rodio [`Sink`] on a shared output stream. Buses are
//! plain gain multipliers applied on top of the voice volume; the
//! [`RodioBusMixer`] writes them in response to decibel attenuation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use sfx2d_common::{AudioError, AudioResult, BusId};
use tracing::{debug, info};

use crate::clip::AudioClip;
use crate::voice::{DeviceFactory, PlaybackDevice};
use crate::volume::{db_to_linear, BusMixer};

type BusGains = Arc<RwLock<HashMap<BusId, f32>>>;

fn bus_gain(gains: &BusGains, bus: Option<&BusId>) -> f32 {
    bus.and_then(|bus| gains.read().get(bus).copied())
        .unwrap_or(1.0)
}

/// Streams a clip's shared samples without copying them.
#[derive(Debug, Clone)]
struct ClipSource {
    samples: Arc<Vec<f32>>,
    position: usize,
    channels: u16,
    sample_rate: u32,
}

impl ClipSource {
    fn new(clip: &AudioClip) -> Self {
        Self {
            samples: Arc::clone(&clip.samples),
            position: 0,
            channels: clip.channels,
            sample_rate: clip.sample_rate,
        }
    }
}

impl Iterator for ClipSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.samples.get(self.position).copied()?;
        self.position += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.samples.len().saturating_sub(self.position);
        (left, Some(left))
    }
}

impl Source for ClipSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.samples.len().saturating_sub(self.position))
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        let frames = self.samples.len() / usize::from(self.channels.max(1));
        Some(Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate.max(1))))
    }
}

/// Creates rodio-backed voices on the default output device.
pub struct RodioDeviceFactory {
    /// The output stream (must be kept alive).
    _stream: OutputStream,
    /// Handle for creating sinks.
    handle: OutputStreamHandle,
    /// Linear gain per bus.
    gains: BusGains,
}

impl std::fmt::Debug for RodioDeviceFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioDeviceFactory")
            .field("buses", &self.gains.read().len())
            .finish_non_exhaustive()
    }
}

impl RodioDeviceFactory {
    /// Opens the default output device.
    pub fn new() -> AudioResult<Self> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

        info!("Audio output device opened");

        Ok(Self {
            _stream: stream,
            handle,
            gains: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Mixer that controls the gain of every voice this factory creates.
    #[must_use]
    pub fn mixer(&self) -> RodioBusMixer {
        RodioBusMixer {
            gains: Arc::clone(&self.gains),
        }
    }
}

impl DeviceFactory for RodioDeviceFactory {
    fn create_device(&mut self) -> AudioResult<Box<dyn PlaybackDevice>> {
        let sink =
            Sink::try_new(&self.handle).map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
        debug!("Created rodio sink");

        Ok(Box::new(RodioVoice {
            sink,
            gains: Arc::clone(&self.gains),
            clip: None,
            bus: None,
            looping: false,
            volume: 1.0,
            stopped: true,
        }))
    }
}

/// A voice playing through one rodio sink.
pub struct RodioVoice {
    sink: Sink,
    gains: BusGains,
    clip: Option<AudioClip>,
    bus: Option<BusId>,
    looping: bool,
    /// Linear voice volume before the bus gain.
    volume: f32,
    /// Set by `stop`; sinks drain their queue asynchronously.
    stopped: bool,
}

impl std::fmt::Debug for RodioVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioVoice")
            .field("clip", &self.clip.as_ref().map(|c| &c.handle))
            .field("bus", &self.bus)
            .field("looping", &self.looping)
            .field("volume", &self.volume)
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

impl RodioVoice {
    fn apply_volume(&self) {
        let gain = bus_gain(&self.gains, self.bus.as_ref());
        self.sink.set_volume(self.volume * gain);
    }
}

impl PlaybackDevice for RodioVoice {
    fn set_clip(&mut self, clip: Option<AudioClip>) {
        self.clip = clip;
    }

    fn set_bus(&mut self, bus: Option<BusId>) {
        self.bus = bus;
        self.apply_volume();
    }

    fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.sink.set_speed(pitch);
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.apply_volume();
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn play(&mut self) {
        let Some(clip) = self.clip.as_ref() else {
            debug!("Play on a voice with no clip ignored");
            return;
        };

        if !self.sink.empty() {
            self.sink.stop();
        }

        let source = ClipSource::new(clip);
        if self.looping {
            self.sink.append(source.repeat_infinite());
        } else {
            self.sink.append(source);
        }
        self.sink.play();
        self.stopped = false;
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.stopped = true;
    }

    fn is_playing(&self) -> bool {
        !self.stopped && !self.sink.empty() && !self.sink.is_paused()
    }
}

/// Bus mixer for rodio voices.
///
/// Gains are read whenever a voice's volume is applied, so callers re-apply
/// voice volumes after changing a bus.
#[derive(Debug, Clone, Default)]
pub struct RodioBusMixer {
    gains: BusGains,
}

impl RodioBusMixer {
    /// Current linear gain of a bus.
    #[must_use]
    pub fn gain(&self, bus: &BusId) -> f32 {
        bus_gain(&self.gains, Some(bus))
    }
}

impl BusMixer for RodioBusMixer {
    fn set_bus_attenuation_db(&mut self, bus: &BusId, db: f32) {
        let gain = db_to_linear(db).clamp(0.0, 1.0);
        self.gains.write().insert(bus.clone(), gain);
        debug!("Bus '{}' set to {:.1} dB (gain {:.4})", bus, db, gain);
    }
}
