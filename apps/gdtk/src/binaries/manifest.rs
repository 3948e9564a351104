//! Local inventory of downloaded Godot binaries.
//!
//! The manifest lives at `<binaries>/manifest.json` and maps
//! version → release → architecture → entry:
//!
//! ```json
//! {
//!   "versions": {
//!     "3.1": {
//!       "stable": {
//!         "linux-64": {
//!           "added_timestamp": "2024-05-01T12:00:00Z",
//!           "bin": "Godot_v3.1-stable_x11.64"
//!         }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Every mutation is written through to disk immediately. The manifest caches
//! what is on disk; it is not authoritative, so path lookups re-check that
//! the file still exists.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::arch::Architecture;
use super::paths::GdtkPaths;
use super::store::{read_json, write_json};
use crate::errors::GdtkError;

/// Version specifier that must be resolved before touching the manifest.
const LATEST: &str = "latest";

/// Metadata recorded for one registered binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// RFC 3339 time of registration.
    pub added_timestamp: String,
    /// File name inside the binaries directory.
    pub bin: String,
}

type ArchEntries = BTreeMap<Architecture, ManifestEntry>;
type ReleaseEntries = BTreeMap<String, ArchEntries>;

/// The persisted manifest document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub versions: BTreeMap<String, ReleaseEntries>,
}

/// One row of [`Manifest::iter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstalledBinary<'a> {
    pub version: &'a str,
    pub release: &'a str,
    pub arch: Architecture,
    pub entry: &'a ManifestEntry,
}

impl Manifest {
    #[must_use]
    pub fn get(&self, version: &str, release: &str, arch: Architecture) -> Option<&ManifestEntry> {
        self.versions.get(version)?.get(release)?.get(&arch)
    }

    /// Inserts or overwrites the entry for a triple.
    pub fn insert(&mut self, version: &str, release: &str, arch: Architecture, entry: ManifestEntry) {
        self.versions
            .entry(version.to_string())
            .or_default()
            .entry(release.to_string())
            .or_default()
            .insert(arch, entry);
    }

    /// Removes the entry for a triple, dropping release and version maps
    /// left empty.
    pub fn remove(
        &mut self,
        version: &str,
        release: &str,
        arch: Architecture,
    ) -> Option<ManifestEntry> {
        let releases = self.versions.get_mut(version)?;
        let arches = releases.get_mut(release)?;
        let removed = arches.remove(&arch)?;

        if arches.is_empty() {
            releases.remove(release);
        }
        if releases.is_empty() {
            self.versions.remove(version);
        }
        Some(removed)
    }

    /// Iterates over every entry, ordered by version, release then architecture.
    pub fn iter(&self) -> impl Iterator<Item = InstalledBinary<'_>> {
        self.versions.iter().flat_map(|(version, releases)| {
            releases.iter().flat_map(move |(release, arches)| {
                arches.iter().map(move |(arch, entry)| InstalledBinary {
                    version,
                    release,
                    arch: *arch,
                    entry,
                })
            })
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Owns the manifest store and the binaries directory it describes.
#[derive(Debug)]
pub struct BinaryManifest {
    binaries_dir: PathBuf,
    store_path: PathBuf,
    manifest: Manifest,
}

impl BinaryManifest {
    /// Loads the manifest, creating the directory and an empty store if absent.
    ///
    /// # Errors
    ///
    /// Returns [`GdtkError::Storage`] if the store cannot be created, read or
    /// parsed.
    pub fn load(paths: &GdtkPaths) -> Result<Self, GdtkError> {
        let binaries_dir = paths.binaries.clone();
        let store_path = paths.manifest_file.clone();

        std::fs::create_dir_all(&binaries_dir).map_err(|e| {
            GdtkError::storage_with_source(
                format!("Failed to create directory {}", binaries_dir.display()),
                e,
            )
        })?;

        let manifest = if store_path.exists() {
            read_json(&store_path)?
        } else {
            let seeded = Manifest::default();
            write_json(&store_path, &seeded)?;
            seeded
        };

        Ok(Self {
            binaries_dir,
            store_path,
            manifest,
        })
    }

    /// The in-memory manifest as of the last load or mutation.
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    #[must_use]
    pub fn binaries_dir(&self) -> &Path {
        &self.binaries_dir
    }

    fn save(&self) -> Result<(), GdtkError> {
        write_json(&self.store_path, &self.manifest)
    }

    /// Replaces the in-memory manifest with the store on disk, so a mutation
    /// does not drop entries written by another process since `load`.
    fn reload(&mut self) -> Result<(), GdtkError> {
        self.manifest = if self.store_path.exists() {
            read_json(&self.store_path)?
        } else {
            Manifest::default()
        };
        Ok(())
    }

    /// Copies `source` into the binaries directory under its canonical name
    /// and records it.
    ///
    /// The store is re-read before the entry is added. Re-registering a triple overwrites both the file and the entry. Returns
    /// `Ok(false)` without touching the manifest when `source` is missing or
    /// is not a regular file.
    ///
    /// # Errors
    ///
    /// Returns [`GdtkError::Storage`] if the copy or the write-through fails.
    pub fn register_binary(
        &mut self,
        version: &str,
        release: &str,
        arch: Architecture,
        source: &Path,
    ) -> Result<bool, GdtkError> {
        if !source.is_file() {
            tracing::warn!(
                source = %source.display(),
                "not registering: source is missing or not a regular file"
            );
            return Ok(false);
        }

        let bin = arch.canonical_binary_name(version, release);
        let dest = self.binaries_dir.join(&bin);

        std::fs::copy(source, &dest).map_err(|e| {
            GdtkError::storage_with_source(
                format!("Failed to copy {} to {}", source.display(), dest.display()),
                e,
            )
        })?;

        if !dest.is_file() {
            return Ok(false);
        }
        set_executable(&dest)?;

        self.reload()?;
        self.manifest.insert(
            version,
            release,
            arch,
            ManifestEntry {
                added_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                bin,
            },
        );
        self.save()?;

        tracing::info!(version, release, %arch, dest = %dest.display(), "registered binary");
        Ok(true)
    }

    /// Returns the path of a registered binary if its file still exists.
    ///
    /// # Errors
    ///
    /// Returns [`GdtkError::InvalidQuery`] for the unresolved `latest` specifier.
    pub fn lookup_binary_path(
        &self,
        version: &str,
        release: &str,
        arch: Architecture,
    ) -> Result<Option<PathBuf>, GdtkError> {
        reject_unresolved(version)?;

        Ok(self
            .manifest
            .get(version, release, arch)
            .map(|entry| self.binaries_dir.join(&entry.bin))
            .filter(|path| path.is_file()))
    }

    /// Returns the raw entry for a triple, read fresh from disk.
    ///
    /// The file itself is not checked. A missing store reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`GdtkError::InvalidQuery`] for `latest`, or
    /// [`GdtkError::Storage`] if the store exists but cannot be parsed.
    pub fn lookup_binary_info(
        &self,
        version: &str,
        release: &str,
        arch: Architecture,
    ) -> Result<Option<ManifestEntry>, GdtkError> {
        reject_unresolved(version)?;

        if !self.store_path.exists() {
            return Ok(None);
        }
        let on_disk: Manifest = read_json(&self.store_path)?;
        Ok(on_disk.get(version, release, arch).cloned())
    }

    /// Deletes a registered binary and its entry.
    ///
    /// Works on the store as currently on disk. Returns whether an entry was
    /// removed. A file that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GdtkError::InvalidQuery`] for `latest`, or
    /// [`GdtkError::Storage`] if the file cannot be deleted or the store
    /// cannot be written.
    pub fn remove_binary(
        &mut self,
        version: &str,
        release: &str,
        arch: Architecture,
    ) -> Result<bool, GdtkError> {
        reject_unresolved(version)?;
        self.reload()?;

        let Some(entry) = self.manifest.get(version, release, arch) else {
            return Ok(false);
        };

        let path = self.binaries_dir.join(&entry.bin);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(GdtkError::storage_with_source(
                    format!("Failed to delete {}", path.display()),
                    e,
                ));
            }
        }

        self.manifest.remove(version, release, arch);
        self.save()?;
        tracing::info!(version, release, %arch, "removed binary");
        Ok(true)
    }

    /// Every registered entry, paired with whether its file is present.
    #[must_use]
    pub fn entries(&self) -> Vec<(InstalledBinary<'_>, bool)> {
        self.manifest
            .iter()
            .map(|row| {
                let present = self.binaries_dir.join(&row.entry.bin).is_file();
                (row, present)
            })
            .collect()
    }
}

fn reject_unresolved(version: &str) -> Result<(), GdtkError> {
    if version == LATEST {
        return Err(GdtkError::invalid_query(
            "cannot query the manifest for \"latest\"; resolve it through the catalog first",
        ));
    }
    Ok(())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<(), GdtkError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
        GdtkError::storage_with_source(
            format!("Failed to set permissions on {}", path.display()),
            e,
        )
    })
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn set_executable(_path: &Path) -> Result<(), GdtkError> {
    Ok(())
}
