//! Godot binary management for the gdtk CLI.
//!
//! This module discovers which Godot builds exist upstream, resolves a
//! version specifier to a download, fetches and unpacks it, and records the
//! result in a local manifest so repeat requests are served from disk.
//!
//! ## Module Structure
//!
//! - [`arch`] - Target architectures and their filename suffixes
//! - [`version`] - Ordering of Godot version strings
//! - [`listing`] - Parsing of the server's HTML directory listings
//! - [`catalog`] - Cached catalog of upstream versions, releases and nightlies
//! - [`manifest`] - Inventory of downloaded binaries
//! - [`download`] - HTTP client with progress reporting
//! - [`verify`] - SHA-256 verification
//! - [`archive`] - ZIP and tar.gz extraction
//! - [`paths`] - Data directory layout
//! - [`acquire`] - The resolve/download/extract/register pipeline

pub mod acquire;
pub mod arch;
pub mod archive;
pub mod catalog;
pub mod download;
pub mod listing;
pub mod manifest;
pub mod paths;
mod store;
pub mod verify;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;

pub use acquire::{AcquireOutcome, Acquirer};
pub use arch::Architecture;
pub use catalog::{CatalogCache, LATEST, NIGHTLY, STABLE};
pub use download::{HttpClient, ProgressCallback, ProgressEvent};
pub use manifest::BinaryManifest;
pub use paths::GdtkPaths;
