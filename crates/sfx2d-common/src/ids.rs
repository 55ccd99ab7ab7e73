//! Identifier types for sounds, assets and mixer buses.
//!
//! All three are shared-string newtypes: cloning one is a reference-count
//! bump, so they can be handed to callbacks and stored in several maps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Lookup key for a sound in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioReference(Arc<str>);

impl AudioReference {
    /// Creates a reference to the named sound.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the sound name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AudioReference {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for AudioReference {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl fmt::Display for AudioReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier the asset loader uses to load and release a clip.
///
/// For file-backed loaders this is the asset path relative to the asset
/// root, always with `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetHandle(Arc<str>);

impl AssetHandle {
    /// Creates a handle from its key.
    #[must_use]
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    /// Returns the raw key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.0
    }

    /// Returns true if the key is empty (an unset reference).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// File stem of the key: `sfx/explosion.wav` -> `explosion`.
    #[must_use]
    pub fn stem(&self) -> Option<&str> {
        Path::new(self.key()).file_stem().and_then(|s| s.to_str())
    }
}

impl From<&str> for AssetHandle {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mixer destination a voice routes its signal through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(Arc<str>);

impl BusId {
    /// Name of the bus used when authoring data names none.
    pub const MASTER: &'static str = "master";

    /// Creates a bus identifier.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The master bus.
    #[must_use]
    pub fn master() -> Self {
        Self::new(Self::MASTER)
    }

    /// Returns the bus name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for BusId {
    fn default() -> Self {
        Self::master()
    }
}

impl From<&str> for BusId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
