//! Releases command for the gdtk CLI.
//!
//! Lists the release channels the catalog knows for one version.
//!
//! ## Usage
//!
//! ```bash
//! gdtk releases 3.2
//! gdtk releases latest
//! ```

use anyhow::Result;
use clap::Args;

use super::Environment;
use crate::binaries::LATEST;
use crate::errors::GdtkError;

/// Arguments for the releases command.
#[derive(Args)]
pub struct ReleasesArgs {
    /// Version to inspect, or "latest".
    #[clap(default_value = LATEST)]
    pub version: String,
}

/// Executes the releases command.
///
/// # Errors
///
/// Returns an error if the catalog is unavailable or the version is unknown.
pub async fn execute(args: &ReleasesArgs) -> Result<()> {
    let env = Environment::load()?;
    let cache = env.fresh_catalog().await?;
    let catalog = cache.catalog();

    let version = if args.version == LATEST {
        catalog
            .latest_version()
            .ok_or_else(|| GdtkError::catalog_unavailable("the catalog has no versions"))?
    } else {
        args.version.as_str()
    };

    let record = catalog
        .versions
        .get(version)
        .ok_or_else(|| GdtkError::version_not_found(version))?;

    println!("Releases of Godot {version}:");
    for (release, info) in &record.releases {
        println!("  {release:<10} {}", info.last_modified);
    }

    Ok(())
}
