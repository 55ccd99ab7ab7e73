//! Error types for the sfx2d audio layer.
//!
//! Playback operations never surface these to callers; they are logged
//! where they are swallowed. Construction paths (catalogs, manifests,
//! devices) return them as `AudioResult`.

use thiserror::Error;

use crate::ids::AssetHandle;

/// Errors produced by the audio layer.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Name is not present in the catalog.
    #[error("Audio '{name}' not found in catalog")]
    NotFound {
        /// Name that was looked up
        name: String,
    },

    /// Catalog or asset system has not finished initializing.
    #[error("Audio library not initialized yet")]
    NotInitialized,

    /// Asset system could not produce the concrete asset.
    #[error("Failed to load audio asset '{asset}': {reason}")]
    LoadFailed {
        /// Asset that failed to load
        asset: AssetHandle,
        /// Error message
        reason: String,
    },

    /// Two catalog entries share a name.
    #[error("Duplicate audio name in catalog: {0}")]
    DuplicateName(String),

    /// Two catalog entries share an asset.
    #[error("Duplicate asset in catalog: {0}")]
    DuplicateAsset(AssetHandle),

    /// A playback device could not be created.
    #[error("Playback device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Authoring data could not be parsed.
    #[error("Invalid audio manifest: {0}")]
    Manifest(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AudioError {
    /// Shorthand for a `NotFound` error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Shorthand for a `LoadFailed` error.
    pub fn load_failed(asset: &AssetHandle, reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            asset: asset.clone(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;
