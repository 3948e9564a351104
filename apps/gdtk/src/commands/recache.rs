//! Recache command for the gdtk CLI.
//!
//! Rebuilds the catalog from the distribution server regardless of its age.
//! The previous catalog is kept if the rebuild fails.
//!
//! ## Usage
//!
//! ```bash
//! gdtk recache
//! GDTK_DIST_SERVER=https://mirror.example.org/godot gdtk recache
//! ```

use anyhow::Result;

use super::Environment;

/// Executes the recache command.
///
/// # Errors
///
/// Returns an error if the server cannot be reached or the new catalog
/// cannot be written.
pub async fn execute() -> Result<()> {
    let env = Environment::load()?;
    let mut cache = env.catalog()?;

    println!("Rebuilding catalog from {}...", env.config.remote.base_url);
    cache.rebuild().await?;

    let catalog = cache.catalog();
    println!("Cached {} versions.", catalog.versions.len());
    if let Some(nightly) = &catalog.nightly {
        println!("Nightly build: {} ({})", nightly.short_commit(), nightly.date);
    }

    Ok(())
}
