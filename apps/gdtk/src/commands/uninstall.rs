//! Uninstall command for the gdtk CLI.
//!
//! Deletes a downloaded binary and its manifest entry. The version must be
//! exact; nightly builds are addressed by their short commit.
//!
//! ## Usage
//!
//! ```bash
//! gdtk uninstall 3.1
//! gdtk uninstall 3.2 rc3 windows
//! gdtk uninstall nightly 1a2b3c4
//! ```

use anyhow::Result;
use clap::Args;

use super::Environment;
use crate::binaries::{Architecture, STABLE};

/// Arguments for the uninstall command.
#[derive(Args)]
pub struct UninstallArgs {
    /// Exact version to remove.
    pub version: String,

    /// Release channel. For nightly builds, the short commit.
    #[clap(default_value = STABLE)]
    pub release: String,

    /// Architecture alias. Defaults to this host.
    pub arch: Option<String>,
}

/// Executes the uninstall command.
///
/// # Errors
///
/// Returns an error if the architecture is unknown, the version is
/// `latest`, or the file or manifest cannot be updated.
#[allow(clippy::unused_async)]
pub async fn execute(args: &UninstallArgs) -> Result<()> {
    let arch = Architecture::from_user_string(args.arch.as_deref())?;
    let env = Environment::load()?;
    let mut manifest = env.manifest()?;

    if manifest.remove_binary(&args.version, &args.release, arch)? {
        println!(
            "Removed Godot {} ({}, {arch}).",
            args.version, args.release
        );
    } else {
        println!(
            "Godot {} ({}, {arch}) is not installed.",
            args.version, args.release
        );
    }

    Ok(())
}
