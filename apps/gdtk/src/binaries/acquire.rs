//! The acquisition pipeline: resolve, download, unpack and register a build.
//!
//! ```text
//! resolve ──► already in manifest? ──yes──► done (no network)
//!                 │ no
//!                 ▼
//!   download ─► verify (nightly) ─► extract ─► register ─► cleanup
//! ```
//!
//! Each acquisition gets its own scratch directory under the downloads
//! directory. It is removed on every exit path once the download starts,
//! including failures.

use std::path::{Path, PathBuf};

use super::archive::{ArchiveKind, extract_archive, find_payload};
use super::arch::Architecture;
use super::catalog::{CatalogCache, DownloadTarget};
use super::download::{HttpClient, ProgressCallback};
use super::manifest::BinaryManifest;
use super::paths::GdtkPaths;
use super::verify::verify_sha256;
use crate::errors::{AcquisitionStep, GdtkError};

/// Result of a successful [`Acquirer::acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The manifest already had the build; nothing was downloaded.
    AlreadyInstalled { target: DownloadTarget, path: PathBuf },
    /// The build was downloaded and registered.
    Installed { target: DownloadTarget, path: PathBuf },
}

impl AcquireOutcome {
    #[must_use]
    pub fn target(&self) -> &DownloadTarget {
        match self {
            Self::AlreadyInstalled { target, .. } | Self::Installed { target, .. } => target,
        }
    }

    /// Path of the managed binary.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::AlreadyInstalled { path, .. } | Self::Installed { path, .. } => path,
        }
    }
}

/// Removes a scratch directory when dropped.
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn create(path: PathBuf) -> Result<Self, GdtkError> {
        // Left over from a process that was killed mid-acquisition.
        if path.exists()
            && let Err(e) = std::fs::remove_dir_all(&path)
        {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to remove stale scratch directory"
            );
        }
        std::fs::create_dir_all(&path).map_err(|e| {
            GdtkError::acquisition_with_source(
                AcquisitionStep::Prepare,
                format!("Failed to create scratch directory {}", path.display()),
                e,
            )
        })?;
        Ok(Self { path })
    }

    fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to clean up scratch directory"
            );
        }
    }
}

/// Runs acquisitions against one catalog and manifest.
pub struct Acquirer<'a> {
    catalog: &'a CatalogCache,
    manifest: &'a mut BinaryManifest,
    paths: &'a GdtkPaths,
    http: &'a HttpClient,
    progress: Option<ProgressCallback>,
}

impl<'a> Acquirer<'a> {
    #[must_use]
    pub fn new(
        catalog: &'a CatalogCache,
        manifest: &'a mut BinaryManifest,
        paths: &'a GdtkPaths,
        http: &'a HttpClient,
    ) -> Self {
        Self {
            catalog,
            manifest,
            paths,
            http,
            progress: None,
        }
    }

    /// Reports download progress to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Makes the build for `(spec, release, arch)` available locally.
    ///
    /// The specifier is resolved once through the catalog, and the resolved
    /// version and release are used both for the manifest check and for
    /// registration. A manifest entry whose file has gone missing counts as
    /// absent. Nothing is retried.
    ///
    /// # Errors
    ///
    /// Resolution errors from [`CatalogCache::resolve_download`] are returned
    /// unchanged. Failures after resolution are [`GdtkError::Acquisition`]
    /// tagged with the failing step.
    pub async fn acquire(
        &mut self,
        spec: &str,
        release: &str,
        arch: Architecture,
    ) -> Result<AcquireOutcome, GdtkError> {
        let target = self.catalog.resolve_download(spec, release, arch)?;
        tracing::debug!(
            spec,
            version = %target.version,
            release = %target.release,
            url = %target.url,
            "resolved download"
        );

        if let Some(path) = self.installed_path(&target, arch)? {
            return Ok(AcquireOutcome::AlreadyInstalled { target, path });
        }

        let scratch = ScratchDir::create(self.paths.scratch_dir(&target.filename))?;
        let path = self.fetch_and_register(&target, arch, &scratch).await?;
        drop(scratch);

        Ok(AcquireOutcome::Installed { target, path })
    }

    /// The managed binary for `target`, judged by the store as currently on
    /// disk. An entry whose file is gone counts as absent.
    fn installed_path(
        &self,
        target: &DownloadTarget,
        arch: Architecture,
    ) -> Result<Option<PathBuf>, GdtkError> {
        let Some(entry) = self
            .manifest
            .lookup_binary_info(&target.version, &target.release, arch)?
        else {
            return Ok(None);
        };

        let path = self.manifest.binaries_dir().join(&entry.bin);
        if path.is_file() {
            return Ok(Some(path));
        }

        tracing::warn!(
            version = %target.version,
            release = %target.release,
            %arch,
            "manifest entry points at a missing file, downloading again"
        );
        Ok(None)
    }

    async fn fetch_and_register(
        &mut self,
        target: &DownloadTarget,
        arch: Architecture,
        scratch: &ScratchDir,
    ) -> Result<PathBuf, GdtkError> {
        let download_path = scratch.join(&target.filename);
        self.http
            .download(&target.url, &download_path, self.progress.clone())
            .await
            .map_err(|e| GdtkError::acquisition_from(AcquisitionStep::Download, &e))?;

        if let Some(expected) = &target.sha256 {
            verify_sha256(&download_path, expected)
                .map_err(|e| GdtkError::acquisition_from(AcquisitionStep::Verify, &e))?;
        }

        let payload = if ArchiveKind::from_file_name(&target.filename).is_some() {
            let extract_dir = scratch.join("extract");
            extract_archive(&download_path, &extract_dir)
                .and_then(|()| find_payload(&extract_dir))
                .map_err(|e| GdtkError::acquisition_from(AcquisitionStep::Extract, &e))?
        } else {
            download_path
        };

        if let Some(name) = payload.file_name().and_then(|n| n.to_str()) {
            let named_for = Architecture::from_binary_name(name);
            if named_for != Architecture::Unknown && named_for != arch {
                tracing::warn!(
                    payload = name,
                    requested = %arch,
                    named_for = %named_for,
                    "payload name suggests a different architecture"
                );
            }
        }

        let registered = self
            .manifest
            .register_binary(&target.version, &target.release, arch, &payload)
            .map_err(|e| {
                GdtkError::acquisition_with_source(
                    AcquisitionStep::Register,
                    format!("Failed to register {}", payload.display()),
                    e,
                )
            })?;
        if !registered {
            return Err(GdtkError::acquisition(
                AcquisitionStep::Register,
                format!(
                    "{} is not a single executable file",
                    payload
                        .file_name()
                        .map_or_else(|| payload.display().to_string(), |n| n.to_string_lossy().into_owned())
                ),
            ));
        }

        self.manifest
            .lookup_binary_path(&target.version, &target.release, arch)?
            .ok_or_else(|| {
                GdtkError::acquisition(
                    AcquisitionStep::Register,
                    "registered binary is missing from the binaries directory",
                )
            })
    }
}
