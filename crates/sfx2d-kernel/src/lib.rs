//! # sfx2d Kernel
//!
//! Sound-effect playback core for 2D games.
//!
//! This crate provides:
//! - The audio catalog (logical name to asset and output bus)
//! - An asset loader facade with in-memory and streaming implementations
//! - A free-asset reaper that unloads idle assets after a grace period
//! - A growable voice pool with once-per-tick reclamation
//! - Volume ramps, decibel helpers and bus levels
//! - The playback coordinator, [`AudioManager`]
//! - Rodio-backed playback devices
//!
//! ## Threading
//!
//! Everything is driven from one thread. Asset loads complete through
//! callbacks on that same thread: synchronously when the clip is resident,
//! otherwise from `AudioManager::tick`. Only the streaming loader uses a
//! worker thread, and it never touches playback state.
//!
//! ## Lifecycle
//!
//! A finished voice is reclaimed on the next tick. When no busy voice uses
//! an asset any more, its catalog name is marked free; if it is not played
//! again within the configured timeout, the loader releases it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod catalog;
pub mod clip;
pub mod config;
pub mod loader;
pub mod manager;
pub mod pool;
pub mod ramp;
pub mod reaper;
pub mod rodio_backend;
pub mod streaming;
pub mod voice;
pub mod volume;

#[cfg(test)]
mod test_support;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::catalog::*;
    pub use crate::clip::*;
    pub use crate::config::*;
    pub use crate::loader::*;
    pub use crate::manager::*;
    pub use crate::pool::*;
    pub use crate::ramp::*;
    pub use crate::reaper::*;
    pub use crate::rodio_backend::*;
    pub use crate::streaming::*;
    pub use crate::voice::*;
    pub use crate::volume::*;
    pub use sfx2d_common::prelude::*;
}

pub use prelude::*;
