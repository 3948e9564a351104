//! On-disk layout of the gdtk data directory.
//!
//! The default root is `~/.gdtk/` (`%APPDATA%\gdtk` on Windows) and can be
//! overridden with the `GDTK_HOME` environment variable.
//!
//! ## Directory Structure
//!
//! ```text
//! ~/.gdtk/                    # Root directory (or GDTK_HOME)
//!   gdtk.toml                 # Optional configuration
//!   cache.json                # Catalog of upstream versions
//!   godot_bin/                # Managed binaries
//!     manifest.json           # Local manifest
//!     Godot_v3.1-stable_x11.64
//!   tmp/                      # Per-acquisition scratch directories
//! ```
//!
//! The `cache.json`, `godot_bin` and `tmp` names come from `[paths]` in
//! `gdtk.toml`; relative values resolve against the root.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::PathsConfig;

/// Environment variable to override the default data root.
pub const GDTK_HOME_ENV: &str = "GDTK_HOME";

/// File name of the local manifest inside the binaries directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Resolved paths of every file and directory gdtk manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GdtkPaths {
    pub root: PathBuf,
    pub binaries: PathBuf,
    pub downloads: PathBuf,
    pub catalog_file: PathBuf,
    pub manifest_file: PathBuf,
}

impl GdtkPaths {
    /// Returns the data root from `GDTK_HOME` or the platform default.
    ///
    /// # Errors
    ///
    /// Returns an error if `GDTK_HOME` is unset and the home (or `AppData`)
    /// directory cannot be determined.
    pub fn default_root() -> Result<PathBuf> {
        if let Ok(home) = std::env::var(GDTK_HOME_ENV)
            && !home.trim().is_empty()
        {
            return Ok(PathBuf::from(home));
        }

        #[cfg(windows)]
        {
            Ok(dirs::data_dir()
                .context("Cannot determine AppData directory. Set GDTK_HOME.")?
                .join("gdtk"))
        }
        #[cfg(not(windows))]
        {
            Ok(dirs::home_dir()
                .context("Cannot determine home directory. Set GDTK_HOME.")?
                .join(".gdtk"))
        }
    }

    /// Lays out paths under `root` using the configured names.
    #[must_use = "returns new paths without side effects"]
    pub fn from_config(root: PathBuf, config: &PathsConfig) -> Self {
        let binaries = resolve(&root, &config.binaries);
        Self {
            manifest_file: binaries.join(MANIFEST_FILE),
            downloads: resolve(&root, &config.downloads),
            catalog_file: resolve(&root, &config.catalog_cache),
            binaries,
            root,
        }
    }

    /// Lays out paths under `root` with the default names.
    #[cfg(test)]
    #[must_use = "returns new paths without side effects"]
    pub fn with_root(root: PathBuf) -> Self {
        Self::from_config(root, &PathsConfig::default())
    }

    /// A scratch directory for one acquisition, unique within this process.
    #[must_use]
    pub fn scratch_dir(&self, label: &str) -> PathBuf {
        let label: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.downloads
            .join(format!("{label}-{}", std::process::id()))
    }

    /// Creates the root, binaries and downloads directories.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.root, &self.binaries, &self.downloads] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}

fn resolve(root: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
