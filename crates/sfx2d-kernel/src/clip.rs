//! Concrete audio assets handed out by the loaders.

use std::sync::Arc;
use std::time::Duration;

use sfx2d_common::AssetHandle;

/// A decoded clip ready for playback.
///
/// Samples are interleaved `f32` and shared, so clones are cheap and every
/// voice playing the same asset reads the same buffer.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Asset this clip was loaded from.
    pub handle: AssetHandle,
    /// Interleaved sample data.
    pub samples: Arc<Vec<f32>>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo).
    pub channels: u16,
}

impl AudioClip {
    /// Create a clip from decoded samples.
    #[must_use]
    pub fn new(handle: AssetHandle, samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            handle,
            samples: Arc::new(samples),
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
        }
    }

    /// Get the number of samples per channel.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Playback length at normal pitch.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count() as f64 / f64::from(self.sample_rate))
    }

    /// Get the size in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.samples.len() * std::mem::size_of::<f32>()
    }
}
