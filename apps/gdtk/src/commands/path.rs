//! Path command for the gdtk CLI.
//!
//! Prints the absolute path of a downloaded binary, for use in scripts.
//! `latest` and `nightly` are resolved through the catalog; exact versions
//! are looked up without touching the network.
//!
//! ## Usage
//!
//! ```bash
//! gdtk path 3.1
//! gdtk path latest stable linux
//! "$(gdtk path nightly)" --headless
//! ```

use anyhow::{Result, bail};
use clap::Args;

use super::Environment;
use crate::binaries::{Architecture, LATEST, NIGHTLY, STABLE};

/// Arguments for the path command.
#[derive(Args)]
pub struct PathArgs {
    /// Version to look up: an exact version, "latest" or "nightly".
    #[clap(default_value = LATEST)]
    pub version: String,

    /// Release channel. For nightly builds, the short commit.
    #[clap(default_value = STABLE)]
    pub release: String,

    /// Architecture alias. Defaults to this host.
    pub arch: Option<String>,
}

/// Executes the path command.
///
/// # Errors
///
/// Returns an error if the architecture is unknown, a specifier cannot be
/// resolved, or the binary is not installed.
pub async fn execute(args: &PathArgs) -> Result<()> {
    let arch = Architecture::from_user_string(args.arch.as_deref())?;
    let env = Environment::load()?;

    let (version, release) = if args.version == LATEST || args.version == NIGHTLY {
        let cache = env.fresh_catalog().await?;
        let target = cache.resolve_download(&args.version, &args.release, arch)?;
        (target.version, target.release)
    } else {
        (args.version.clone(), args.release.clone())
    };

    let manifest = env.manifest()?;
    let Some(path) = manifest.lookup_binary_path(&version, &release, arch)? else {
        bail!(
            "Godot {version} ({release}, {arch}) is not installed. \
             Run `gdtk install {} {} {arch}` first.",
            args.version,
            args.release
        );
    };

    println!("{}", path.display());
    Ok(())
}
