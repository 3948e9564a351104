#![warn(clippy::pedantic)]

//! # Godot Toolkit (gdtk)
//!
//! The `gdtk` command downloads and manages Godot engine binaries. It keeps a
//! cached catalog of what the distribution server offers and a local
//! manifest of what has already been downloaded, so repeat requests for the
//! same build are served from disk.
//!
//! ## Subcommands
//!
//! - `install` - Download a build and register it locally
//! - `recache` - Rebuild the catalog from the distribution server
//! - `versions` - List versions available upstream
//! - `releases` - List release channels of a version
//! - `list` - List downloaded binaries
//! - `path` - Print the path of a downloaded binary
//! - `uninstall` - Remove a downloaded binary
//!
//! ## Examples
//!
//! Install the latest stable build for this machine:
//! ```bash
//! gdtk install
//! ```
//!
//! Run a specific version:
//! ```bash
//! "$(gdtk path 3.1)" --editor
//! ```

mod binaries;
mod commands;
mod config;
mod errors;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{install, list, path, recache, releases, uninstall, versions};
use errors::GdtkError;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "GDTK_LOG";

/// Godot binary manager.
#[derive(Parser)]
#[command(
    name = "gdtk",
    author,
    version,
    about = "Download and manage Godot engine binaries",
    long_about = "The 'gdtk' command resolves Godot versions against a cached catalog of the \
    distribution server, downloads the matching build and keeps track of it locally.",
    after_help = "\
ARCHITECTURES:
    Aliases: linux, linux32, linux64, windows, win32, win64, macos, osx
    Ids:     linux-32, linux-64, linux-headless-64, linux-server-64,
             windows-32, windows-64, macos-64
    Defaults to the machine running gdtk.

ENVIRONMENT VARIABLES:
    GDTK_HOME               Data directory (default: ~/.gdtk)
    GDTK_DIST_SERVER        Distribution server URL (overrides gdtk.toml)
    GDTK_LOG                Log filter, e.g. 'debug' or 'gdtk=trace' (default: warn)"
)]
pub struct Cli {
    /// Log debug output to stderr.
    #[clap(long, short, global = true, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the gdtk CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Download and register a Godot build.
    ///
    /// Resolves the version against the catalog, refreshing it when older
    /// than a day. Builds already in the manifest are not downloaded again.
    Install(install::InstallArgs),

    /// Rebuild the catalog from the distribution server.
    Recache,

    /// List versions available on the distribution server.
    Versions(versions::VersionsArgs),

    /// List the release channels of a version.
    Releases(releases::ReleasesArgs),

    /// List downloaded binaries.
    List,

    /// Print the path of a downloaded binary.
    Path(path::PathArgs),

    /// Remove a downloaded binary.
    Uninstall(uninstall::UninstallArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Prints an error and returns the exit code for it.
///
/// An unknown architecture is a usage error and exits with 2. Errors that a
/// fresher catalog might fix get a hint to run `gdtk recache`.
fn handle_error(e: &anyhow::Error) -> i32 {
    eprintln!("Error: {e:?}");

    match e.downcast_ref::<GdtkError>() {
        Some(GdtkError::UnknownArchitecture { .. }) => {
            eprintln!();
            eprintln!("Run 'gdtk --help' for the list of architectures.");
            2
        }
        Some(err) if err.suggests_recache() => {
            eprintln!();
            eprintln!("The catalog may be out of date. Run 'gdtk recache' and try again.");
            1
        }
        _ => 1,
    }
}

fn initialize_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("gdtk=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(cli.verbose);

    match cli.command {
        Commands::Install(args) => install::execute(&args).await,
        Commands::Recache => recache::execute().await,
        Commands::Versions(args) => versions::execute(&args).await,
        Commands::Releases(args) => releases::execute(&args).await,
        Commands::List => list::execute().await,
        Commands::Path(args) => path::execute(&args).await,
        Commands::Uninstall(args) => uninstall::execute(&args).await,
    }
}
