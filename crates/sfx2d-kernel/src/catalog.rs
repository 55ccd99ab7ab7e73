//! Audio catalog: the static name -> (asset, bus) mapping.
//!
//! The catalog is built once from authored entries and never mutated
//! afterwards. Names and assets are both unique, so the reverse lookups
//! (`name_of`, `bus_of`) are well defined.
//!
//! Authoring data is a TOML manifest:
//!
//! ```toml
//! [[audio]]
//! name = "explosion"
//! asset = "sfx/explosion.wav"
//! bus = "sfx"
//! ```
//!
//! `name` defaults to the asset's file stem and `bus` to `master`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sfx2d_common::{AssetHandle, AudioError, AudioResult, BusId};
use tracing::{debug, info, warn};

/// One authored catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioEntry {
    name: String,
    asset: AssetHandle,
    bus: BusId,
}

impl AudioEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(name: impl Into<String>, asset: AssetHandle, bus: BusId) -> Self {
        Self {
            name: name.into(),
            asset,
            bus,
        }
    }

    /// Logical name callers play the sound by.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Asset the loader resolves.
    #[must_use]
    pub fn asset(&self) -> &AssetHandle {
        &self.asset
    }

    /// Output bus.
    #[must_use]
    pub fn bus(&self) -> &BusId {
        &self.bus
    }
}

/// Serialized form of a catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogManifest {
    /// Entries in authoring order.
    #[serde(default, rename = "audio")]
    pub entries: Vec<ManifestEntry>,
}

/// Serialized form of one entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Explicit name; the asset's file stem when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Asset key. Entries with an empty key are skipped.
    #[serde(default)]
    pub asset: String,
    /// Output bus; `master` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus: Option<String>,
}

/// Immutable catalog of every playable sound.
#[derive(Debug, Default)]
pub struct AudioCatalog {
    /// Entries in authoring order.
    entries: Vec<AudioEntry>,
    /// Name to entry index.
    by_name: HashMap<String, usize>,
    /// Asset to entry index.
    by_asset: HashMap<AssetHandle, usize>,
}

impl AudioCatalog {
    /// Builds a catalog from authored entries.
    ///
    /// Fails on duplicate names or duplicate assets.
    pub fn new(entries: Vec<AudioEntry>) -> AudioResult<Self> {
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_asset = HashMap::with_capacity(entries.len());

        for (idx, entry) in entries.iter().enumerate() {
            if by_name.insert(entry.name.clone(), idx).is_some() {
                return Err(AudioError::DuplicateName(entry.name.clone()));
            }
            if by_asset.insert(entry.asset.clone(), idx).is_some() {
                return Err(AudioError::DuplicateAsset(entry.asset.clone()));
            }
        }

        debug!("Built audio catalog with {} entries", entries.len());

        Ok(Self {
            entries,
            by_name,
            by_asset,
        })
    }

    /// Builds a catalog from a parsed manifest.
    pub fn from_manifest(manifest: CatalogManifest) -> AudioResult<Self> {
        let mut entries = Vec::with_capacity(manifest.entries.len());

        for (idx, raw) in manifest.entries.into_iter().enumerate() {
            let asset = AssetHandle::new(raw.asset.trim());
            if asset.is_empty() {
                warn!("Skipping catalog entry #{idx}: no asset assigned");
                continue;
            }

            let name = match raw.name {
                Some(name) if !name.trim().is_empty() => name.trim().to_string(),
                _ => match asset.stem() {
                    Some(stem) => stem.to_string(),
                    None => {
                        warn!("Skipping catalog entry #{idx}: cannot derive a name from '{asset}'");
                        continue;
                    },
                },
            };

            let bus = raw.bus.map_or_else(BusId::master, BusId::new);
            entries.push(AudioEntry::new(name, asset, bus));
        }

        Self::new(entries)
    }

    /// Parses a TOML manifest.
    pub fn from_toml_str(contents: &str) -> AudioResult<Self> {
        let manifest: CatalogManifest =
            toml::from_str(contents).map_err(|e| AudioError::Manifest(e.to_string()))?;
        Self::from_manifest(manifest)
    }

    /// Loads a TOML manifest from disk.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AudioResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&contents)?;
        info!(
            "Loaded audio catalog from {} ({} sounds)",
            path.display(),
            catalog.len()
        );
        Ok(catalog)
    }

    /// Resolves a name to its asset and bus.
    pub fn resolve(&self, name: &str) -> AudioResult<(&AssetHandle, &BusId)> {
        self.entry(name)
            .map(|entry| (&entry.asset, &entry.bus))
            .ok_or_else(|| AudioError::not_found(name))
    }

    /// Returns the entry for a name.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&AudioEntry> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    /// Checks whether a name is in the catalog.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All names in authoring order.
    #[must_use]
    pub fn all_names(&self) -> Vec<&str> {
        self.entries.iter().map(AudioEntry::name).collect()
    }

    /// All assets in authoring order.
    #[must_use]
    pub fn assets(&self) -> Vec<&AssetHandle> {
        self.entries.iter().map(AudioEntry::asset).collect()
    }

    /// All entries in authoring order.
    #[must_use]
    pub fn entries(&self) -> &[AudioEntry] {
        &self.entries
    }

    /// Reverse lookup: asset to name.
    #[must_use]
    pub fn name_of(&self, asset: &AssetHandle) -> Option<&str> {
        self.by_asset
            .get(asset)
            .map(|&idx| self.entries[idx].name.as_str())
    }

    /// Reverse lookup: asset to bus.
    #[must_use]
    pub fn bus_of(&self, asset: &AssetHandle) -> Option<&BusId> {
        self.by_asset.get(asset).map(|&idx| &self.entries[idx].bus)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
