//! # sfx2d
//!
//! Command-line host for the sfx2d audio layer: loads a catalog, starts
//! the streaming loader and drives the playback tick at a fixed rate.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod timing;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sfx2d_kernel::PlayOptions;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::app::PlayRequest;
use crate::config::PlayerConfig;

/// Command-line interface.
#[derive(Parser)]
#[command(name = "sfx2d")]
#[command(about = "Play sound effects from an sfx2d catalog", version)]
struct Cli {
    /// Player configuration file
    #[arg(long, short, global = true, env = "SFX2D_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every sound in the catalog
    List,
    /// Play one or more sounds by name
    Play {
        /// Sound names
        #[arg(required = true)]
        names: Vec<String>,

        /// Loop until the idle limit
        #[arg(long = "loop")]
        looping: bool,

        /// Linear volume (0.0 - 1.0)
        #[arg(long, default_value_t = 1.0)]
        volume: f32,

        /// Pitch multiplier
        #[arg(long, default_value_t = 1.0)]
        pitch: f32,

        /// Fade-in and fade-out time in seconds
        #[arg(long, default_value_t = 0.0)]
        fade: f32,
    },
}

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("sfx2d=info".parse()?))
        .init();

    let cli = Cli::parse();

    info!("sfx2d {} starting", env!("CARGO_PKG_VERSION"));

    let config = cli
        .config
        .as_deref()
        .map_or_else(PlayerConfig::default, PlayerConfig::load_from);

    match cli.command {
        Commands::List => app::list(&config)?,
        Commands::Play {
            names,
            looping,
            volume,
            pitch,
            fade,
        } => {
            let request = PlayRequest {
                names,
                options: PlayOptions::default()
                    .with_looping(looping)
                    .with_volume(volume)
                    .with_pitch(pitch)
                    .with_fade_in(fade),
                fade_out: fade.max(0.0),
            };
            app::play(&config, &request)?;
        },
    }

    Ok(())
}
