//! Streaming asset loader.
//!
//! Reads and decodes audio files on a worker thread so the tick thread never
//! blocks on IO:
//!
//! ```text
//! tick thread                         worker thread
//! ───────────                         ─────────────
//! new() ──────────────────────────▶   scan asset root
//! ensure_loaded(h) ── Load(h) ────▶   read + decode h
//! poll() ◀──────── Scanned / Loaded ── reply
//!   └─ runs waiters for h (FIFO)
//! ```
//!
//! Handles are paths relative to the asset root with `/` separators.
//! The loader reports itself initialized once the scan has been delivered
//! by `poll`.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use rodio::{Decoder, Source};
use sfx2d_common::{AssetHandle, AudioError, AudioResult};
use tracing::{debug, info, warn};

use crate::clip::AudioClip;
use crate::loader::{AssetLoader, LoadCallback, LoaderStats, PendingLoads};

/// File extensions the scanner treats as audio assets.
pub const AUDIO_EXTENSIONS: [&str; 4] = ["wav", "mp3", "ogg", "flac"];

/// Decoded samples sent back from the worker.
struct DecodedClip {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

enum WorkerReply {
    Scanned(HashSet<AssetHandle>),
    Loaded {
        handle: AssetHandle,
        result: Result<DecodedClip, String>,
    },
}

/// Loader that decodes files under an asset root on a worker thread.
pub struct StreamingAssetLoader {
    /// Asset root directory.
    root: PathBuf,
    /// Load requests to the worker.
    requests: Option<Sender<AssetHandle>>,
    /// Replies from the worker.
    replies: Receiver<WorkerReply>,
    /// Worker thread.
    worker: Option<JoinHandle<()>>,
    /// Assets found by the start-up scan; `None` until delivered.
    known: Option<HashSet<AssetHandle>>,
    /// Clips in memory.
    resident: HashMap<AssetHandle, AudioClip>,
    /// Waiters for loads in flight.
    pending: PendingLoads,
    /// Statistics.
    stats: LoaderStats,
}

impl std::fmt::Debug for StreamingAssetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingAssetLoader")
            .field("root", &self.root)
            .field("initialized", &self.known.is_some())
            .field("resident", &self.resident.len())
            .field("pending", &self.pending)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl StreamingAssetLoader {
    /// Starts the worker for an asset root.
    pub fn new(root: impl Into<PathBuf>) -> AudioResult<Self> {
        let root = root.into();
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<AssetHandle>();
        let (reply_tx, reply_rx) = crossbeam_channel::unbounded::<WorkerReply>();

        let worker_root = root.clone();
        let worker = std::thread::Builder::new()
            .name("sfx2d-loader".to_string())
            .spawn(move || run_worker(&worker_root, &request_rx, &reply_tx))?;

        info!("Started streaming asset loader at {}", root.display());

        Ok(Self {
            root,
            requests: Some(request_tx),
            replies: reply_rx,
            worker: Some(worker),
            known: None,
            resident: HashMap::new(),
            pending: PendingLoads::new(),
            stats: LoaderStats::default(),
        })
    }

    /// Returns the asset root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of clips in memory.
    #[must_use]
    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }

    /// Total memory held by resident clips.
    #[must_use]
    pub fn resident_bytes(&self) -> usize {
        self.resident.values().map(AudioClip::size_bytes).sum()
    }

    fn handle_reply(&mut self, reply: WorkerReply) {
        match reply {
            WorkerReply::Scanned(known) => {
                info!("Asset scan complete: {} audio assets", known.len());
                self.known = Some(known);
            },
            WorkerReply::Loaded { handle, result } => {
                let result = match result {
                    Ok(decoded) => {
                        self.stats.loads_completed += 1;
                        let clip = AudioClip::new(
                            handle.clone(),
                            decoded.samples,
                            decoded.sample_rate,
                            decoded.channels,
                        );
                        debug!(
                            "Loaded {} ({} frames, {}Hz, {} channels)",
                            handle,
                            clip.frame_count(),
                            clip.sample_rate,
                            clip.channels
                        );
                        self.resident.insert(handle.clone(), clip.clone());
                        Ok(clip)
                    },
                    Err(reason) => {
                        self.stats.loads_failed += 1;
                        debug!("Load of {} failed: {}", handle, reason);
                        Err(AudioError::load_failed(&handle, reason))
                    },
                };
                self.pending.complete(&handle, &result);
            },
        }
    }

    /// Fails loads in flight once the worker is gone; later requests fail
    /// in `ensure_loaded`.
    fn worker_stopped(&mut self) {
        if self.requests.take().is_some() {
            warn!("Asset loader worker stopped");
        }
        if self.pending.is_empty() {
            return;
        }

        let failed = self.pending.fail_all("loader worker stopped");
        self.stats.loads_failed += failed as u64;
        warn!("Failed {} waiting loads after the worker stopped", failed);
    }
}

impl AssetLoader for StreamingAssetLoader {
    fn ensure_loaded(&mut self, handle: &AssetHandle, on_complete: LoadCallback) {
        if let Some(clip) = self.resident.get(handle) {
            self.stats.cache_hits += 1;
            on_complete(Ok(clip.clone()));
            return;
        }

        if !self.pending.enqueue(handle, on_complete) {
            self.stats.joined_in_flight += 1;
            return;
        }

        self.stats.loads_started += 1;
        let sent = self
            .requests
            .as_ref()
            .is_some_and(|tx| tx.send(handle.clone()).is_ok());

        if !sent {
            warn!("Asset loader worker is gone; failing load of {}", handle);
            self.stats.loads_failed += 1;
            let result = Err(AudioError::load_failed(handle, "loader worker stopped"));
            self.pending.complete(handle, &result);
        }
    }

    fn release(&mut self, handle: &AssetHandle) {
        if self.resident.remove(handle).is_some() {
            self.stats.releases += 1;
            debug!("Unloaded {}", handle);
        }
    }

    fn is_loaded(&self, handle: &AssetHandle) -> bool {
        self.resident.contains_key(handle)
    }

    fn is_available(&self, handle: &AssetHandle) -> bool {
        self.known
            .as_ref()
            .is_some_and(|known| known.contains(handle))
    }

    fn is_initialized(&self) -> bool {
        self.known.is_some()
    }

    fn poll(&mut self) {
        loop {
            match self.replies.try_recv() {
                Ok(reply) => self.handle_reply(reply),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.worker_stopped();
                    break;
                },
            }
        }
    }

    fn loads_in_flight(&self) -> usize {
        self.pending.len()
    }

    fn stats(&self) -> &LoaderStats {
        &self.stats
    }
}

impl Drop for StreamingAssetLoader {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Asset loader worker panicked");
            }
        }
    }
}

fn run_worker(root: &Path, requests: &Receiver<AssetHandle>, replies: &Sender<WorkerReply>) {
    let mut known = HashSet::new();
    scan_directory(root, root, &mut known);
    if replies.send(WorkerReply::Scanned(known)).is_err() {
        return;
    }

    for handle in requests {
        let result = decode_file(&root.join(handle.key()));
        if replies.send(WorkerReply::Loaded { handle, result }).is_err() {
            return;
        }
    }
}

/// Collects every audio file under `dir` as a root-relative handle.
fn scan_directory(root: &Path, dir: &Path, known: &mut HashSet<AssetHandle>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read asset directory {:?}: {}", dir, e);
            return;
        },
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            scan_directory(root, &path, known);
            continue;
        }
        // Symlinked files are assets; symlinked directories may loop.
        if file_type.is_symlink() && path.is_dir() {
            debug!("Skipping symlinked directory {:?}", path);
            continue;
        }

        let is_audio = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if !is_audio {
            continue;
        }

        if let Ok(relative) = path.strip_prefix(root) {
            let key = relative
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/");
            known.insert(AssetHandle::new(key));
        }
    }
}

fn decode_file(path: &Path) -> Result<DecodedClip, String> {
    let file = fs::File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let decoder = Decoder::new(BufReader::new(file)).map_err(|e| e.to_string())?;

    let sample_rate = decoder.sample_rate();
    let channels = decoder.channels();
    let samples: Vec<f32> = decoder.convert_samples::<f32>().collect();

    if samples.is_empty() {
        return Err("decoded zero samples".to_string());
    }

    Ok(DecodedClip {
        samples,
        sample_rate,
        channels,
    })
}
