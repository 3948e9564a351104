//! Error types for the gdtk CLI.
//!
//! Library-level operations (catalog, manifest, acquisition) return
//! [`GdtkError`] so callers can react to a specific failure kind. Command
//! handlers wrap these in `anyhow::Error`, and `main` downcasts at the top
//! level to choose the exit status and any follow-up hint.

use std::fmt;
use thiserror::Error;

/// Boxed source error carried by variants that wrap I/O, HTTP or parse failures.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// The pipeline step at which an acquisition failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionStep {
    /// Creating the scratch download directory.
    Prepare,
    /// Fetching the archive from the distribution server.
    Download,
    /// Checking the downloaded file against a published hash.
    Verify,
    /// Unpacking the archive and locating the binary.
    Extract,
    /// Placing the binary into the managed directory and recording it.
    Register,
}

impl AcquisitionStep {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Download => "download",
            Self::Verify => "verify",
            Self::Extract => "extract",
            Self::Register => "register",
        }
    }
}

impl fmt::Display for AcquisitionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consolidated error type for gdtk operations.
#[derive(Debug, Error)]
pub enum GdtkError {
    /// A user-supplied architecture alias did not match any known target.
    #[error("unknown architecture: {alias}")]
    UnknownArchitecture {
        /// The alias as typed by the user.
        alias: String,
    },

    /// A persisted store (catalog or manifest) could not be read or written.
    #[error("storage error: {message}")]
    Storage {
        /// Which store and operation failed.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<BoxedSource>,
    },

    /// The configuration file exists but is invalid.
    #[error("config error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// Rebuilding the catalog from the distribution server failed.
    ///
    /// The previously loaded catalog is left untouched.
    #[error("catalog refresh failed: {message}")]
    CatalogRefresh {
        /// Description of the failed request or parse.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<BoxedSource>,
    },

    /// The catalog has no data for the request (empty catalog, no nightly entry,
    /// or no nightly build for the architecture).
    #[error("catalog unavailable: {message}")]
    CatalogUnavailable {
        /// What was missing.
        message: String,
    },

    /// The requested version or release is not in the catalog.
    #[error("{message}")]
    VersionOrRelease {
        /// The version or release that was not found.
        message: String,
    },

    /// The API was called with arguments it never accepts.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// What was wrong with the query.
        message: String,
    },

    /// Downloading, extracting or registering a binary failed.
    #[error("acquisition failed during {step}: {message}")]
    Acquisition {
        /// The step that failed.
        step: AcquisitionStep,
        /// Description of the failure.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<BoxedSource>,
    },
}

impl GdtkError {
    /// Creates a new `UnknownArchitecture` error.
    #[must_use]
    pub fn unknown_architecture(alias: impl Into<String>) -> Self {
        Self::UnknownArchitecture {
            alias: alias.into(),
        }
    }

    /// Creates a new `Storage` error wrapping a source error.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new `Config` error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new `CatalogRefresh` error.
    #[must_use]
    pub fn catalog_refresh(message: impl Into<String>) -> Self {
        Self::CatalogRefresh {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `CatalogUnavailable` error.
    #[must_use]
    pub fn catalog_unavailable(message: impl Into<String>) -> Self {
        Self::CatalogUnavailable {
            message: message.into(),
        }
    }

    /// Creates a `VersionOrRelease` error for a version missing from the catalog.
    #[must_use]
    pub fn version_not_found(version: &str) -> Self {
        Self::VersionOrRelease {
            message: format!(
                "{version} not available. If this is a new version then you may need to recache"
            ),
        }
    }

    /// Creates a `VersionOrRelease` error for a release missing from a version.
    #[must_use]
    pub fn release_not_found(release: &str, version: &str) -> Self {
        Self::VersionOrRelease {
            message: format!(
                "{release} not available in {version}. If this is a new version/release then \
                 you may need to recache"
            ),
        }
    }

    /// Creates a new `InvalidQuery` error.
    #[must_use]
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Creates a new `Acquisition` error without a source.
    #[must_use]
    pub fn acquisition(step: AcquisitionStep, message: impl Into<String>) -> Self {
        Self::Acquisition {
            step,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `Acquisition` error wrapping a typed source error.
    #[must_use]
    pub fn acquisition_with_source(
        step: AcquisitionStep,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Acquisition {
            step,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new `Acquisition` error from an `anyhow` chain.
    ///
    /// The chain is flattened into the message so no context is lost.
    #[must_use]
    pub fn acquisition_from(step: AcquisitionStep, error: &anyhow::Error) -> Self {
        Self::Acquisition {
            step,
            message: format!("{error:#}"),
            source: None,
        }
    }

    /// Returns true when re-scraping the catalog may fix the error.
    #[must_use]
    pub fn suggests_recache(&self) -> bool {
        matches!(
            self,
            Self::VersionOrRelease { .. } | Self::CatalogUnavailable { .. }
        )
    }
}
