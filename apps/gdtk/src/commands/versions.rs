//! Versions command for the gdtk CLI.
//!
//! Lists the Godot versions known to the catalog, newest first.
//!
//! ## Usage
//!
//! ```bash
//! gdtk versions          # Human-readable list
//! gdtk versions --json   # Machine-readable list
//! ```

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::Environment;

/// Arguments for the versions command.
#[derive(Args)]
pub struct VersionsArgs {
    /// Print the list as JSON.
    #[clap(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct VersionRow<'a> {
    version: &'a str,
    last_modified: &'a str,
    releases: Vec<&'a str>,
}

#[derive(Serialize)]
struct NightlyRow<'a> {
    commit: &'a str,
    date: &'a str,
}

#[derive(Serialize)]
struct Listing<'a> {
    server: &'a str,
    last_refreshed: Option<String>,
    versions: Vec<VersionRow<'a>>,
    nightly: Option<NightlyRow<'a>>,
}

/// Executes the versions command.
///
/// # Errors
///
/// Returns an error if the catalog is empty and cannot be built.
pub async fn execute(args: &VersionsArgs) -> Result<()> {
    let env = Environment::load()?;
    let cache = env.fresh_catalog().await?;
    let catalog = cache.catalog();

    let versions: Vec<VersionRow<'_>> = catalog
        .versions_newest_first()
        .into_iter()
        .filter_map(|version| {
            catalog.versions.get(version).map(|record| VersionRow {
                version,
                last_modified: &record.last_modified,
                releases: record.releases.keys().map(String::as_str).collect(),
            })
        })
        .collect();

    if args.json {
        let listing = Listing {
            server: &cache.config().remote.base_url,
            last_refreshed: catalog.last_refreshed.map(|at| at.to_rfc3339()),
            versions,
            nightly: catalog.nightly.as_ref().map(|n| NightlyRow {
                commit: &n.commit,
                date: &n.date,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if versions.is_empty() && catalog.nightly.is_none() {
        println!("No versions available.");
        return Ok(());
    }

    println!("Available versions:");
    for row in &versions {
        println!("  {:<10} {}", row.version, row.releases.join(", "));
    }
    if let Some(nightly) = &catalog.nightly {
        println!("  {:<10} {} ({})", "nightly", nightly.short_commit(), nightly.date);
    }

    Ok(())
}
