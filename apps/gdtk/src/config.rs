//! Static configuration for gdtk.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults (the public Godot mirrors)
//! 2. `gdtk.toml` in the data root, if present
//! 3. The `GDTK_DIST_SERVER` environment variable for the download server
//!
//! ## File Format
//!
//! ```toml
//! [paths]
//! binaries = "godot_bin"
//! downloads = "tmp"
//! catalog_cache = "cache.json"
//!
//! [remote]
//! base_url = "https://downloads.tuxfamily.org/godotengine"
//! request_timeout_secs = 30
//! download_timeout_secs = 600
//!
//! [nightly]
//! manifest_url = "https://archive.hugo.pro/builds/godot/editor/godot-linux-nightly-x86_64.AppImage.manifest.json"
//!
//! [nightly.downloads]
//! linux-64 = "https://archive.hugo.pro/builds/godot/editor/godot-linux-nightly-x86_64.AppImage"
//! ```
//!
//! Every key is optional.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::binaries::Architecture;
use crate::errors::GdtkError;

/// Name of the configuration file inside the data root.
pub const CONFIG_FILE: &str = "gdtk.toml";

/// Environment variable overriding the download server base URL.
pub const DIST_SERVER_ENV: &str = "GDTK_DIST_SERVER";

const DEFAULT_BASE_URL: &str = "https://downloads.tuxfamily.org/godotengine";

const NIGHTLY_ROOT: &str = "https://archive.hugo.pro/builds/godot/editor";

/// Locations of managed files, relative to the data root unless absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding downloaded binaries and `manifest.json`.
    pub binaries: String,
    /// Scratch directory for in-flight downloads and extraction.
    pub downloads: String,
    /// Persisted catalog file.
    pub catalog_cache: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            binaries: "godot_bin".to_string(),
            downloads: "tmp".to_string(),
            catalog_cache: "cache.json".to_string(),
        }
    }
}

/// The distribution server hosting stable and pre-release builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Root of the directory listing, without trailing slash.
    pub base_url: String,
    /// Timeout for listing and manifest requests.
    pub request_timeout_secs: u64,
    /// Timeout for whole archive downloads.
    pub download_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            download_timeout_secs: 600,
        }
    }
}

/// Where nightly builds and their build manifest live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NightlyConfig {
    /// JSON document with `commit`, `date` and `sha256` of the latest build.
    pub manifest_url: String,
    /// Direct download URL per architecture.
    pub downloads: BTreeMap<Architecture, String>,
    /// The architecture whose build the manifest's `sha256` describes.
    pub manifest_arch: Architecture,
}

impl Default for NightlyConfig {
    fn default() -> Self {
        let downloads = [
            (
                Architecture::Linux64,
                "godot-linux-nightly-x86_64.AppImage",
            ),
            (Architecture::Windows64, "godot-windows-nightly-x86_64.zip"),
            (Architecture::Windows32, "godot-windows-nightly-x86.zip"),
            (Architecture::Macos64, "godot-macos-nightly-x86_64.dmg"),
        ]
        .into_iter()
        .map(|(arch, file)| (arch, format!("{NIGHTLY_ROOT}/{file}")))
        .collect();

        Self {
            manifest_url: format!(
                "{NIGHTLY_ROOT}/godot-linux-nightly-x86_64.AppImage.manifest.json"
            ),
            downloads,
            manifest_arch: Architecture::Linux64,
        }
    }
}

/// Complete gdtk configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub remote: RemoteConfig,
    pub nightly: NightlyConfig,
}

impl Config {
    /// Loads `gdtk.toml` from the data root and applies environment overrides.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GdtkError::Config`] if the file exists but cannot be read or parsed.
    pub fn load(root: &Path) -> Result<Self, GdtkError> {
        let mut config = Self::from_file(&root.join(CONFIG_FILE))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parses a configuration file without consulting the environment.
    ///
    /// # Errors
    ///
    /// Returns [`GdtkError::Config`] if the file exists but cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, GdtkError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            GdtkError::config(format!("Failed to read {}: {e}", path.display()))
        })?;

        toml::from_str(&content)
            .map_err(|e| GdtkError::config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Applies `GDTK_DIST_SERVER`. Empty or whitespace-only values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(server) = std::env::var(DIST_SERVER_ENV)
            && !server.trim().is_empty()
        {
            self.set_base_url(&server);
        }
    }

    /// Sets the download server, dropping any trailing slash.
    pub fn set_base_url(&mut self, url: &str) {
        self.remote.base_url = url.trim().trim_end_matches('/').to_string();
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.request_timeout_secs)
    }

    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.download_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn defaults_point_at_public_mirrors() {
        let config = Config::default();
        assert_eq!(config.remote.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.paths.binaries, "godot_bin");
        assert_eq!(config.nightly.downloads.len(), 4);
        assert!(
            config.nightly.downloads[&Architecture::Linux64].ends_with(".AppImage")
        );
        assert_eq!(config.nightly.manifest_arch, Architecture::Linux64);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::from_file(&temp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(CONFIG_FILE)
            .write_str(
                r#"
[remote]
base_url = "https://mirror.example.com/godot"

[nightly.downloads]
linux-headless-64 = "https://nightly.example.com/headless.zip"
"#,
            )
            .unwrap();

        let config = Config::from_file(&temp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.remote.base_url, "https://mirror.example.com/godot");
        assert_eq!(config.remote.request_timeout_secs, 30);
        assert_eq!(config.paths, PathsConfig::default());
        assert_eq!(config.nightly.downloads.len(), 1);
        assert_eq!(
            config.nightly.downloads[&Architecture::LinuxHeadless64],
            "https://nightly.example.com/headless.zip"
        );
    }

    #[test]
    fn invalid_file_is_config_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(CONFIG_FILE).write_str("[remote\nbase_url = ").unwrap();

        let err = Config::from_file(&temp.path().join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, GdtkError::Config { .. }));
    }

    #[test]
    fn unknown_architecture_key_is_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(CONFIG_FILE)
            .write_str("[nightly.downloads]\namiga-16 = \"https://x\"\n")
            .unwrap();

        assert!(Config::from_file(&temp.path().join(CONFIG_FILE)).is_err());
    }

    #[test]
    fn set_base_url_trims_trailing_slash() {
        let mut config = Config::default();
        config.set_base_url(" http://127.0.0.1:8080/ ");
        assert_eq!(config.remote.base_url, "http://127.0.0.1:8080");
    }

    #[test]
    #[serial_test::serial]
    fn env_override_replaces_base_url() {
        // SAFETY: serialised test; the variable is removed before returning.
        unsafe {
            std::env::set_var(DIST_SERVER_ENV, "http://localhost:1/");
        }
        let mut config = Config::default();
        config.apply_env_overrides();
        // SAFETY: see above.
        unsafe {
            std::env::remove_var(DIST_SERVER_ENV);
        }
        assert_eq!(config.remote.base_url, "http://localhost:1");
    }

    #[test]
    #[serial_test::serial]
    fn blank_env_override_is_ignored() {
        // SAFETY: serialised test; the variable is removed before returning.
        unsafe {
            std::env::set_var(DIST_SERVER_ENV, "   ");
        }
        let mut config = Config::default();
        config.apply_env_overrides();
        // SAFETY: see above.
        unsafe {
            std::env::remove_var(DIST_SERVER_ENV);
        }
        assert_eq!(config.remote.base_url, DEFAULT_BASE_URL);
    }
}
