//! Cached catalog of the versions, releases and nightly builds published
//! upstream.
//!
//! The catalog is scraped from the distribution server's directory listings
//! and persisted as JSON (`cache.json` by default):
//!
//! ```json
//! {
//!   "versions": {
//!     "3.1": {
//!       "link": "3.1/",
//!       "last_modified": "2019-Mar-13 19:31:43",
//!       "releases": {
//!         "stable": { "link": "3.1/", "last_modified": "2019-Mar-13 19:31:43" },
//!         "rc1": { "link": "rc1/", "last_modified": "2019-Mar-01 10:00:00" }
//!       }
//!     },
//!     "nightly": {
//!       "commit": "0123456789abcdef",
//!       "date": "2024-05-01",
//!       "sha256": "…",
//!       "downloads": { "linux-64": "https://…/godot-linux-nightly-x86_64.AppImage" }
//!     }
//!   },
//!   "last_cache_datetime": "2024-05-01 12:00Z"
//! }
//! ```
//!
//! A catalog older than 24 hours is rebuilt wholesale on the next
//! [`CatalogCache::ensure_fresh`]. A failed rebuild leaves the previous
//! catalog in place, both in memory and on disk.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::arch::{Architecture, PRODUCT_NAME};
use super::download::HttpClient;
use super::listing::{parse_listing, release_directories, version_directories};
use super::store::{read_json, write_json};
use super::version;
use crate::config::Config;
use crate::errors::GdtkError;

/// Version specifier selecting the newest numbered version.
pub const LATEST: &str = "latest";

/// Version specifier (and catalog key) of the nightly channel.
pub const NIGHTLY: &str = "nightly";

/// Release channel of final builds, stored at the version root upstream.
pub const STABLE: &str = "stable";

/// Format of `last_cache_datetime`.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%MZ";

/// Age after which the catalog is rebuilt.
const MAX_AGE_HOURS: i64 = 24;

/// A release channel directory inside a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub link: String,
    pub last_modified: String,
}

/// A version directory and the release channels found in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub link: String,
    pub last_modified: String,
    #[serde(default)]
    pub releases: BTreeMap<String, ReleaseRecord>,
}

/// The latest nightly build, as described by its build manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightlyBuild {
    pub commit: String,
    pub date: String,
    pub sha256: String,
    #[serde(default)]
    pub downloads: BTreeMap<Architecture, String>,
}

impl NightlyBuild {
    /// First seven characters of the commit, used as the nightly "release".
    #[must_use]
    pub fn short_commit(&self) -> String {
        self.commit.chars().take(7).collect()
    }
}

/// Snapshot of what the distribution server offers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredCatalog", into = "StoredCatalog")]
pub struct Catalog {
    /// Numbered versions. Never contains the `nightly` key.
    pub versions: BTreeMap<String, VersionRecord>,
    pub nightly: Option<NightlyBuild>,
    /// When the catalog was last rebuilt, to the minute. `None` if never.
    pub last_refreshed: Option<DateTime<Utc>>,
}

/// Where to fetch a build from, with the version and release resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Concrete version; `nightly` for nightly builds.
    pub version: String,
    /// Concrete release; the short commit for nightly builds.
    pub release: String,
    pub url: String,
    pub filename: String,
    /// Published SHA-256 of the download, when one is known.
    pub sha256: Option<String>,
}

impl Catalog {
    /// True if the catalog has never been populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty() && self.nightly.is_none()
    }

    /// True if the catalog was never refreshed or is older than 24 hours at `now`.
    #[must_use]
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.last_refreshed
            .is_none_or(|at| now - at > TimeDelta::hours(MAX_AGE_HOURS))
    }

    /// The highest numbered version.
    #[must_use]
    pub fn latest_version(&self) -> Option<&str> {
        version::latest(self.versions.keys().map(String::as_str))
    }

    /// Numbered versions, newest first.
    #[must_use]
    pub fn versions_newest_first(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.versions.keys().map(String::as_str).collect();
        version::sort_newest_first(&mut versions);
        versions
    }

    /// Resolves a version specifier, release and architecture to a download.
    ///
    /// `nightly` ignores `release`. `latest` picks the highest numbered
    /// version. The filename of numbered builds is a guess based on upstream
    /// naming; a wrong guess surfaces later as a failed download.
    ///
    /// # Errors
    ///
    /// - [`GdtkError::CatalogUnavailable`] if the catalog has no nightly entry,
    ///   no nightly build for `arch`, or no versions at all for `latest`.
    /// - [`GdtkError::VersionOrRelease`] if the version or release is unknown.
    pub fn resolve_download(
        &self,
        spec: &str,
        release: &str,
        arch: Architecture,
        config: &Config,
    ) -> Result<DownloadTarget, GdtkError> {
        if spec == NIGHTLY {
            return self.resolve_nightly(arch, config);
        }

        let version = if spec == LATEST {
            self.latest_version()
                .ok_or_else(|| GdtkError::catalog_unavailable("the catalog has no versions"))?
        } else {
            spec
        };

        let record = self
            .versions
            .get(version)
            .ok_or_else(|| GdtkError::version_not_found(version))?;
        if release != STABLE && !record.releases.contains_key(release) {
            return Err(GdtkError::release_not_found(release, version));
        }

        let filename = format!("{}.zip", arch.canonical_binary_name(version, release));
        let base = config.remote.base_url.trim_end_matches('/');
        let url = if release == STABLE {
            format!("{base}/{version}/{filename}")
        } else {
            format!("{base}/{version}/{release}/{filename}")
        };

        Ok(DownloadTarget {
            version: version.to_string(),
            release: release.to_string(),
            url,
            filename,
            sha256: None,
        })
    }

    fn resolve_nightly(
        &self,
        arch: Architecture,
        config: &Config,
    ) -> Result<DownloadTarget, GdtkError> {
        let nightly = self
            .nightly
            .as_ref()
            .ok_or_else(|| GdtkError::catalog_unavailable("the catalog has no nightly build"))?;
        let url = nightly.downloads.get(&arch).ok_or_else(|| {
            GdtkError::catalog_unavailable(format!("no nightly build is published for {arch}"))
        })?;

        let short = nightly.short_commit();
        let stem = format!("{PRODUCT_NAME}-nightly-{short}_{}", arch.remote_suffix());
        let last_segment = url.rsplit('/').next().unwrap_or_default();
        let filename = match last_segment.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => format!("{stem}.{ext}"),
            _ => stem,
        };

        let sha256 = (arch == config.nightly.manifest_arch && !nightly.sha256.is_empty())
            .then(|| nightly.sha256.clone());

        Ok(DownloadTarget {
            version: NIGHTLY.to_string(),
            release: short,
            url: url.clone(),
            filename,
            sha256,
        })
    }
}

/// Entry of the persisted `versions` map, which mixes numbered versions
/// with the nightly record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Nightly(NightlyBuild),
    Version(VersionRecord),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredCatalog {
    #[serde(default)]
    versions: BTreeMap<String, StoredEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_cache_datetime: Option<String>,
}

impl TryFrom<StoredCatalog> for Catalog {
    type Error = String;

    fn try_from(stored: StoredCatalog) -> Result<Self, Self::Error> {
        let mut catalog = Catalog::default();

        for (key, entry) in stored.versions {
            match (key.as_str(), entry) {
                (NIGHTLY, StoredEntry::Nightly(build)) => catalog.nightly = Some(build),
                (NIGHTLY, StoredEntry::Version(_)) => {
                    return Err("\"nightly\" entry is missing its commit".to_string());
                }
                (_, StoredEntry::Version(record)) => {
                    catalog.versions.insert(key, record);
                }
                (_, StoredEntry::Nightly(_)) => {
                    return Err(format!("version {key} has no link"));
                }
            }
        }

        catalog.last_refreshed = stored
            .last_cache_datetime
            .map(|raw| {
                NaiveDateTime::parse_from_str(&raw, TIME_FORMAT)
                    .map(|t| t.and_utc())
                    .map_err(|e| format!("invalid last_cache_datetime {raw:?}: {e}"))
            })
            .transpose()?;

        Ok(catalog)
    }
}

impl From<Catalog> for StoredCatalog {
    fn from(catalog: Catalog) -> Self {
        let mut versions: BTreeMap<String, StoredEntry> = catalog
            .versions
            .into_iter()
            .map(|(k, v)| (k, StoredEntry::Version(v)))
            .collect();
        if let Some(nightly) = catalog.nightly {
            versions.insert(NIGHTLY.to_string(), StoredEntry::Nightly(nightly));
        }

        Self {
            versions,
            last_cache_datetime: catalog
                .last_refreshed
                .map(|t| t.format(TIME_FORMAT).to_string()),
        }
    }
}

/// Fields of the nightly build manifest that the catalog keeps.
#[derive(Debug, Deserialize)]
struct NightlyManifest {
    commit: String,
    date: String,
    #[serde(default)]
    sha256: String,
}

fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Owns the catalog store and keeps it fresh.
#[derive(Debug)]
pub struct CatalogCache {
    store_path: PathBuf,
    config: Config,
    http: HttpClient,
    catalog: Catalog,
}

impl CatalogCache {
    /// Reads the persisted catalog, seeding and persisting an empty one if the
    /// store does not exist.
    ///
    /// Does not refresh; call [`ensure_fresh`](Self::ensure_fresh) next.
    ///
    /// # Errors
    ///
    /// Returns [`GdtkError::Storage`] if the store is unreadable or corrupt.
    pub fn load(store_path: PathBuf, config: Config, http: HttpClient) -> Result<Self, GdtkError> {
        let catalog = if store_path.exists() {
            read_json(&store_path)?
        } else {
            tracing::debug!(path = %store_path.display(), "seeding empty catalog");
            let seeded = Catalog::default();
            write_json(&store_path, &seeded)?;
            seeded
        };

        Ok(Self {
            store_path,
            config,
            http,
            catalog,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Rebuilds the catalog if it is stale. Returns whether a rebuild ran.
    ///
    /// # Errors
    ///
    /// Returns [`GdtkError::CatalogRefresh`] if the rebuild fails; the previous
    /// catalog stays usable.
    pub async fn ensure_fresh(&mut self) -> Result<bool, GdtkError> {
        self.ensure_fresh_at(Utc::now()).await
    }

    /// [`ensure_fresh`](Self::ensure_fresh) against an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`ensure_fresh`](Self::ensure_fresh).
    pub async fn ensure_fresh_at(&mut self, now: DateTime<Utc>) -> Result<bool, GdtkError> {
        if !self.catalog.is_stale_at(now) {
            return Ok(false);
        }
        tracing::info!("catalog is outdated, rebuilding");
        self.rebuild_at(now).await?;
        Ok(true)
    }

    /// Scrapes the server and replaces the whole catalog, ignoring its age.
    ///
    /// # Errors
    ///
    /// Returns [`GdtkError::CatalogRefresh`] on any network or parse failure,
    /// or [`GdtkError::Storage`] if the new catalog cannot be persisted. In
    /// both cases the previous catalog is kept.
    pub async fn rebuild(&mut self) -> Result<(), GdtkError> {
        self.rebuild_at(Utc::now()).await
    }

    async fn rebuild_at(&mut self, now: DateTime<Utc>) -> Result<(), GdtkError> {
        let mut fresh = self
            .scrape()
            .await
            .map_err(|e| GdtkError::catalog_refresh(format!("{e:#}")))?;
        fresh.last_refreshed = Some(truncate_to_minute(now));

        write_json(&self.store_path, &fresh)?;
        tracing::info!(
            versions = fresh.versions.len(),
            nightly = fresh.nightly.is_some(),
            "catalog rebuilt"
        );
        self.catalog = fresh;
        Ok(())
    }

    async fn scrape(&self) -> Result<Catalog> {
        let base = self.config.remote.base_url.trim_end_matches('/');
        let mut catalog = Catalog::default();

        let root_html = self
            .http
            .get_text(&format!("{base}/"))
            .await
            .context("Failed to list versions")?;
        let root_entries = parse_listing(&root_html);

        for (version, entry) in version_directories(&root_entries) {
            let html = self
                .http
                .get_text(&format!("{base}/{version}/"))
                .await
                .with_context(|| format!("Failed to list releases of {version}"))?;
            let entries = parse_listing(&html);

            let mut releases = BTreeMap::new();
            releases.insert(
                STABLE.to_string(),
                ReleaseRecord {
                    link: entry.href.clone(),
                    last_modified: entry.last_modified.clone(),
                },
            );
            for release in release_directories(&entries) {
                releases.insert(
                    release.name.clone(),
                    ReleaseRecord {
                        link: release.href.clone(),
                        last_modified: release.last_modified.clone(),
                    },
                );
            }

            tracing::debug!(version = %version, releases = releases.len(), "scraped version");
            catalog.versions.insert(
                version,
                VersionRecord {
                    link: entry.href.clone(),
                    last_modified: entry.last_modified.clone(),
                    releases,
                },
            );
        }

        let nightly = &self.config.nightly;
        if nightly.manifest_url.is_empty() {
            tracing::debug!("no nightly manifest configured");
        } else {
            let manifest: NightlyManifest = self
                .http
                .get_json(&nightly.manifest_url)
                .await
                .context("Failed to fetch the nightly build manifest")?;
            catalog.nightly = Some(NightlyBuild {
                commit: manifest.commit,
                date: manifest.date,
                sha256: manifest.sha256,
                downloads: nightly.downloads.clone(),
            });
        }

        Ok(catalog)
    }

    /// Resolves a download against the current catalog and configuration.
    ///
    /// # Errors
    ///
    /// See [`Catalog::resolve_download`].
    pub fn resolve_download(
        &self,
        spec: &str,
        release: &str,
        arch: Architecture,
    ) -> Result<DownloadTarget, GdtkError> {
        self.catalog
            .resolve_download(spec, release, arch, &self.config)
    }
}
