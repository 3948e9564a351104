//! Install command for the gdtk CLI.
//!
//! Resolves a version specifier against the catalog, downloads the matching
//! build and records it in the local manifest. Builds already in the
//! manifest are not downloaded again.
//!
//! ## Usage
//!
//! ```bash
//! gdtk install                       # Latest stable build for this host
//! gdtk install 3.1                   # Specific version
//! gdtk install 3.2 rc3 windows       # Pre-release for another platform
//! gdtk install nightly               # Latest nightly build
//! gdtk install --recache latest      # Refresh the catalog first
//! ```

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use super::Environment;
use crate::binaries::download::format_bytes;
use crate::binaries::{
    AcquireOutcome, Acquirer, Architecture, LATEST, ProgressCallback, ProgressEvent, STABLE,
};

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Version to install: an exact version, "latest" or "nightly".
    #[clap(default_value = LATEST)]
    pub version: String,

    /// Release channel, e.g. "stable", "rc1" or "beta2". Ignored for nightly.
    #[clap(default_value = STABLE)]
    pub release: String,

    /// Target architecture alias (e.g. linux, win64, osx). Defaults to this host.
    pub arch: Option<String>,

    /// Rebuild the catalog before resolving, regardless of its age.
    #[clap(long)]
    pub recache: bool,
}

/// Executes the install command.
///
/// # Errors
///
/// Returns an error if:
/// - The architecture alias is unknown
/// - The catalog cannot be loaded or (with `--recache`) rebuilt
/// - The version or release is not in the catalog
/// - Download, verification, extraction or registration fails
pub async fn execute(args: &InstallArgs) -> Result<()> {
    let arch = Architecture::from_user_string(args.arch.as_deref())?;
    let env = Environment::load()?;

    let catalog = if args.recache {
        println!("Rebuilding catalog...");
        let mut catalog = env.catalog()?;
        catalog.rebuild().await?;
        catalog
    } else {
        env.fresh_catalog().await?
    };
    let mut manifest = env.manifest()?;

    let outcome = Acquirer::new(&catalog, &mut manifest, &env.paths, &env.http)
        .with_progress(progress_printer())
        .acquire(&args.version, &args.release, arch)
        .await?;

    let target = outcome.target();
    if matches!(outcome, AcquireOutcome::AlreadyInstalled { .. }) {
        println!(
            "Godot {} ({}, {arch}) is already installed.",
            target.version, target.release
        );
    } else {
        println!(
            "Installed Godot {} ({}, {arch}).",
            target.version, target.release
        );
    }
    println!("{}", outcome.path().display());

    Ok(())
}

/// Prints a single updating progress line to stdout.
fn progress_printer() -> ProgressCallback {
    Arc::new(|event: ProgressEvent| match event {
        ProgressEvent::Started { total } => {
            match total {
                Some(total) => println!("Downloading ({})...", format_bytes(total)),
                None => println!("Downloading..."),
            }
        }
        ProgressEvent::Progress { downloaded, total } => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let percent = event.fraction().map_or(0, |f| (f * 100.0) as u8);
            print!(
                "\r{}/{} ({percent}%)     ",
                format_bytes(downloaded),
                format_bytes(total)
            );
            let _ = std::io::stdout().flush();
        }
        ProgressEvent::Completed { downloaded } => {
            println!("\rDownloaded {}.          ", format_bytes(downloaded));
        }
    })
}
