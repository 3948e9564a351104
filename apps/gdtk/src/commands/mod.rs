//! Command modules for the gdtk CLI.
//!
//! ## Acquisition Commands
//!
//! - [`install`] - Download and register a Godot build
//! - [`recache`] - Rebuild the catalog of upstream versions
//!
//! ## Catalog Commands
//!
//! - [`versions`] - List versions available upstream
//! - [`releases`] - List release channels of one version
//!
//! ## Local Commands
//!
//! - [`list`] - List downloaded binaries
//! - [`path`] - Print the path of a downloaded binary
//! - [`uninstall`] - Remove a downloaded binary

pub mod install;
pub mod list;
pub mod path;
pub mod recache;
pub mod releases;
pub mod uninstall;
pub mod versions;

use anyhow::Result;

use crate::binaries::{BinaryManifest, CatalogCache, GdtkPaths, HttpClient};
use crate::config::Config;

/// Everything a command needs to reach the data directory and the network.
pub struct Environment {
    pub paths: GdtkPaths,
    pub config: Config,
    pub http: HttpClient,
}

impl Environment {
    /// Resolves the data root, loads `gdtk.toml` and creates the directory tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be determined, the configuration
    /// is invalid, or a directory cannot be created.
    pub fn load() -> Result<Self> {
        let root = GdtkPaths::default_root()?;
        let config = Config::load(&root)?;
        let paths = GdtkPaths::from_config(root, &config.paths);
        paths.ensure_directories()?;
        let http = HttpClient::new(config.request_timeout(), config.download_timeout())?;

        tracing::debug!(
            root = %paths.root.display(),
            server = %config.remote.base_url,
            "environment loaded"
        );

        Ok(Self {
            paths,
            config,
            http,
        })
    }

    /// Loads the catalog without refreshing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog store is corrupt.
    pub fn catalog(&self) -> Result<CatalogCache> {
        Ok(CatalogCache::load(
            self.paths.catalog_file.clone(),
            self.config.clone(),
            self.http.clone(),
        )?)
    }

    /// Loads the catalog and rebuilds it if stale.
    ///
    /// A failed rebuild is only fatal when there is no earlier catalog to
    /// fall back on.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is corrupt, or if the catalog is empty
    /// and cannot be built.
    pub async fn fresh_catalog(&self) -> Result<CatalogCache> {
        let mut cache = self.catalog()?;
        if let Err(e) = cache.ensure_fresh().await {
            if cache.catalog().is_empty() {
                return Err(e.into());
            }
            tracing::warn!(error = %e, "using the cached catalog");
        }
        Ok(cache)
    }

    /// Loads the local manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest store is corrupt.
    pub fn manifest(&self) -> Result<BinaryManifest> {
        Ok(BinaryManifest::load(&self.paths)?)
    }
}
