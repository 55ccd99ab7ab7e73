//! Player commands and the tick loop.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use sfx2d_common::AudioReference;
use sfx2d_kernel::{
    AssetLoader, AudioCatalog, AudioManager, PlayOptions, RodioDeviceFactory, StreamingAssetLoader,
};
use tracing::{info, warn};

use crate::config::PlayerConfig;
use crate::timing::FrameTiming;

/// How long to wait for the asset scan before giving up.
const SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings of a `play` invocation.
#[derive(Debug, Clone)]
pub struct PlayRequest {
    /// Sound names to play.
    pub names: Vec<String>,
    /// Play options shared by every sound.
    pub options: PlayOptions,
    /// Fade-out used when the idle limit stops looping sounds.
    pub fade_out: f32,
}

fn load_catalog(config: &PlayerConfig) -> Result<AudioCatalog> {
    AudioCatalog::load_from(&config.catalog)
        .with_context(|| format!("Failed to load catalog {}", config.catalog.display()))
}

/// Starts the streaming loader and waits for its asset scan.
fn start_loader(config: &PlayerConfig) -> Result<StreamingAssetLoader> {
    let mut loader = StreamingAssetLoader::new(&config.asset_root).with_context(|| {
        format!("Failed to start asset loader at {}", config.asset_root.display())
    })?;

    let timing = FrameTiming::new(config.target_fps);
    let deadline = Instant::now() + SCAN_TIMEOUT;
    while !loader.is_initialized() {
        if Instant::now() >= deadline {
            bail!("Asset scan of {} timed out", config.asset_root.display());
        }
        std::thread::sleep(timing.frame_budget());
        loader.poll();
    }
    Ok(loader)
}

/// Prints every catalog entry and whether its asset exists.
pub fn list(config: &PlayerConfig) -> Result<()> {
    let catalog = load_catalog(config)?;
    let loader = start_loader(config)?;

    for entry in catalog.entries() {
        let status = if loader.is_available(entry.asset()) {
            "ok"
        } else {
            "missing"
        };
        println!(
            "{:<24} {:<10} {:<8} {}",
            entry.name(),
            entry.bus().name(),
            status,
            entry.asset()
        );
    }

    info!("{} sounds in catalog", catalog.len());
    Ok(())
}

/// Plays the requested sounds and ticks until they finish.
pub fn play(config: &PlayerConfig, request: &PlayRequest) -> Result<()> {
    let catalog = load_catalog(config)?;
    let loader = start_loader(config)?;
    let factory = RodioDeviceFactory::new().context("No audio output available")?;
    let mixer = factory.mixer();

    let mut manager = AudioManager::new(catalog, Box::new(loader), Box::new(factory), config.audio.clone())
        .context("Failed to create audio manager")?
        .with_mixer(Box::new(mixer));

    let references: Vec<AudioReference> = request.names.iter().map(AudioReference::new).collect();
    for reference in &references {
        if !manager.is_audio_available(reference) {
            warn!("'{}' is not available; trying anyway", reference);
        }
        manager.play_audio(reference, request.options);
    }

    let mut timing = FrameTiming::new(config.target_fps);
    let mut elapsed = 0.0_f32;
    let mut stopping = false;

    loop {
        let dt = timing.delta_time();
        manager.tick(dt);
        elapsed += dt;

        let stats = manager.stats();
        if stats.busy_voices == 0 && stats.plays_waiting == 0 {
            break;
        }

        if !stopping && elapsed >= config.idle_exit_secs {
            info!("Idle limit reached, stopping playback");
            for reference in &references {
                manager.stop_audio(reference, request.fade_out);
            }
            stopping = true;
        }
        if stopping && elapsed >= config.idle_exit_secs + request.fade_out + 1.0 {
            manager.stop_all();
        }

        timing.sleep_remainder();
    }

    let loader_stats = manager.loader().stats();
    info!(
        "Playback finished after {:.1}s at {:.0} fps ({} loads, {} failed)",
        elapsed,
        timing.fps(),
        loader_stats.loads_started,
        loader_stats.loads_failed
    );
    Ok(())
}
