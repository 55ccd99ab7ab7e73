//! # sfx2d Common
//!
//! Value types and errors shared by every layer of the sfx2d audio system:
//! - `AudioReference`: the lookup key callers pass around
//! - `AssetHandle` / `BusId`: opaque asset and mixer-group identifiers
//! - `AudioError`: the failure taxonomy of the playback layer

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;
