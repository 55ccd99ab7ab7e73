//! Asset loader facade.
//!
//! Wraps whatever asset system the host uses behind one trait:
//!
//! - [`DirectAssetLoader`]: clips registered in memory up front; every load
//!   completes synchronously.
//! - [`StreamingAssetLoader`](crate::streaming::StreamingAssetLoader): files
//!   read and decoded on a worker thread, completions delivered on `poll`.
//!
//! Completion contract: every callback passed to `ensure_loaded` runs
//! exactly once, on the thread that calls `ensure_loaded`/`poll`. A handle
//! that is already resident completes before `ensure_loaded` returns.
//! Requests for a handle whose load is in flight share that load and are
//! completed in request order.

use std::collections::HashMap;

use sfx2d_common::{AssetHandle, AudioError, AudioResult};
use tracing::debug;

use crate::clip::AudioClip;

/// Continuation invoked with the outcome of a load.
pub type LoadCallback = Box<dyn FnOnce(AudioResult<AudioClip>)>;

/// Facade over the host's asset system.
pub trait AssetLoader {
    /// Makes `handle` resident and reports the clip through `on_complete`.
    fn ensure_loaded(&mut self, handle: &AssetHandle, on_complete: LoadCallback);

    /// Drops the reference taken by `ensure_loaded`; unloads the clip.
    ///
    /// Releasing a handle that is not resident is a no-op.
    fn release(&mut self, handle: &AssetHandle);

    /// Whether the clip is in memory right now.
    fn is_loaded(&self, handle: &AssetHandle) -> bool;

    /// Whether the asset is known to the asset system, resident or not.
    fn is_available(&self, handle: &AssetHandle) -> bool;

    /// Whether the asset system has finished initializing.
    fn is_initialized(&self) -> bool {
        true
    }

    /// Delivers completed loads. Called once per tick.
    fn poll(&mut self) {}

    /// Number of distinct handles with a load in flight.
    fn loads_in_flight(&self) -> usize {
        0
    }

    /// Loader statistics.
    fn stats(&self) -> &LoaderStats;
}

/// Statistics for an asset loader.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoaderStats {
    /// Underlying loads issued.
    pub loads_started: u64,
    /// Underlying loads that produced a clip.
    pub loads_completed: u64,
    /// Underlying loads that failed.
    pub loads_failed: u64,
    /// Requests answered from resident clips.
    pub cache_hits: u64,
    /// Requests that joined a load already in flight.
    pub joined_in_flight: u64,
    /// Releases that unloaded a resident clip.
    pub releases: u64,
}

/// Waiters for loads that are in flight, keyed by handle.
///
/// Keeps one queue per handle so a single underlying load fans out to every
/// caller in request order.
#[derive(Default)]
pub struct PendingLoads {
    waiters: HashMap<AssetHandle, Vec<LoadCallback>>,
}

impl std::fmt::Debug for PendingLoads {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingLoads")
            .field("handles", &self.waiters.len())
            .finish_non_exhaustive()
    }
}

impl PendingLoads {
    /// Create an empty set of pending loads.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a waiter. Returns true if this is the first waiter for the
    /// handle, meaning the caller must start the underlying load.
    pub fn enqueue(&mut self, handle: &AssetHandle, on_complete: LoadCallback) -> bool {
        match self.waiters.get_mut(handle) {
            Some(queue) => {
                queue.push(on_complete);
                false
            },
            None => {
                self.waiters.insert(handle.clone(), vec![on_complete]);
                true
            },
        }
    }

    /// Whether a load is in flight for the handle.
    #[must_use]
    pub fn is_pending(&self, handle: &AssetHandle) -> bool {
        self.waiters.contains_key(handle)
    }

    /// Number of handles with a load in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Returns true if nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Completes every waiter for the handle, in request order.
    ///
    /// Returns the number of callbacks run.
    pub fn complete(&mut self, handle: &AssetHandle, result: &AudioResult<AudioClip>) -> usize {
        let Some(queue) = self.waiters.remove(handle) else {
            return 0;
        };

        let count = queue.len();
        for on_complete in queue {
            on_complete(clone_result(handle, result));
        }
        count
    }

    /// Fails every waiter of every pending handle with `reason`.
    ///
    /// Returns the number of callbacks run.
    pub fn fail_all(&mut self, reason: &str) -> usize {
        let mut handles: Vec<AssetHandle> = self.waiters.keys().cloned().collect();
        handles.sort();

        let mut count = 0;
        for handle in handles {
            let result = Err(AudioError::load_failed(&handle, reason));
            count += self.complete(&handle, &result);
        }
        count
    }
}

/// `AudioError` is not `Clone`; failures are re-created per waiter.
fn clone_result(handle: &AssetHandle, result: &AudioResult<AudioClip>) -> AudioResult<AudioClip> {
    match result {
        Ok(clip) => Ok(clip.clone()),
        Err(AudioError::LoadFailed { reason, .. }) => Err(AudioError::load_failed(handle, reason)),
        Err(other) => Err(AudioError::load_failed(handle, other.to_string())),
    }
}

/// Loader over clips held directly in memory.
///
/// Every registered clip is resident and available for the loader's
/// lifetime; `release` only counts.
#[derive(Debug, Default)]
pub struct DirectAssetLoader {
    clips: HashMap<AssetHandle, AudioClip>,
    stats: LoaderStats,
}

impl DirectAssetLoader {
    /// Create an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a clip under its own handle.
    pub fn insert(&mut self, clip: AudioClip) {
        self.clips.insert(clip.handle.clone(), clip);
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with_clip(mut self, clip: AudioClip) -> Self {
        self.insert(clip);
        self
    }

    /// Number of registered clips.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Returns true if no clip is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

impl AssetLoader for DirectAssetLoader {
    fn ensure_loaded(&mut self, handle: &AssetHandle, on_complete: LoadCallback) {
        match self.clips.get(handle) {
            Some(clip) => {
                self.stats.cache_hits += 1;
                on_complete(Ok(clip.clone()));
            },
            None => {
                self.stats.loads_failed += 1;
                on_complete(Err(AudioError::load_failed(handle, "no clip registered")));
            },
        }
    }

    fn release(&mut self, handle: &AssetHandle) {
        if self.clips.contains_key(handle) {
            self.stats.releases += 1;
            debug!("Released direct asset {handle} (stays resident)");
        }
    }

    fn is_loaded(&self, handle: &AssetHandle) -> bool {
        self.clips.contains_key(handle)
    }

    fn is_available(&self, handle: &AssetHandle) -> bool {
        self.clips.contains_key(handle)
    }

    fn stats(&self) -> &LoaderStats {
        &self.stats
    }
}
