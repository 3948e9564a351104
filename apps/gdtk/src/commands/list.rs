//! List command for the gdtk CLI.
//!
//! Shows every binary recorded in the local manifest. Entries whose file
//! has disappeared are flagged.
//!
//! ## Usage
//!
//! ```bash
//! gdtk list
//! ```

use anyhow::Result;

use super::Environment;

/// Executes the list command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read.
#[allow(clippy::unused_async)]
pub async fn execute() -> Result<()> {
    let env = Environment::load()?;
    let manifest = env.manifest()?;

    if manifest.manifest().is_empty() {
        println!("No binaries installed.");
        println!();
        println!("Install one with:");
        println!("  gdtk install latest");
        return Ok(());
    }

    println!("Installed binaries ({}):", manifest.binaries_dir().display());
    for (row, present) in manifest.entries() {
        let marker = if present { "" } else { "  [missing]" };
        println!(
            "  {:<10} {:<10} {:<20} {}{marker}",
            row.version, row.release, row.arch, row.entry.added_timestamp
        );
    }

    Ok(())
}
