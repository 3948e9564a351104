#![warn(clippy::pedantic)]

//! Integration tests for the gdtk CLI.
//!
//! These tests spawn the compiled `gdtk` binary against an isolated
//! `GDTK_HOME` and check stdout, stderr and exit codes. Network-facing
//! commands point `GDTK_DIST_SERVER` at a closed port so they fail fast;
//! the download pipeline itself is covered by the unit tests.
//!
//! ## Test Strategy
//!
//! 1. **Help and usage**: subcommands listed, bad architecture is a usage error
//! 2. **Local commands**: `list`, `path` and `uninstall` against a seeded manifest
//! 3. **Catalog commands**: failures when the server is unreachable
//! 4. **Configuration**: an invalid `gdtk.toml` is reported
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p gdtk
//! ```

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const UNREACHABLE_SERVER: &str = "http://127.0.0.1:1";

const BINARY_NAME: &str = "Godot_v3.1-stable_x11.64";

/// A `gdtk` command isolated to `home` with no reachable server.
fn gdtk(home: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gdtk"));
    cmd.env("GDTK_HOME", home.path())
        .env("GDTK_DIST_SERVER", UNREACHABLE_SERVER)
        .env_remove("GDTK_LOG");
    cmd
}

/// Writes a manifest registering Godot 3.1 stable for `linux-64`.
fn seed_installed_binary(home: &assert_fs::TempDir) {
    home.child("godot_bin").child(BINARY_NAME).write_binary(b"\x7fELF").unwrap();
    home.child("godot_bin")
        .child("manifest.json")
        .write_str(&format!(
            r#"{{
  "versions": {{
    "3.1": {{
      "stable": {{
        "linux-64": {{
          "added_timestamp": "2024-03-01T12:00:00+00:00",
          "bin": "{BINARY_NAME}"
        }}
      }}
    }}
  }}
}}"#
        ))
        .unwrap();
}

// -----------------------------------------------------------------------------
// Help and usage
// -----------------------------------------------------------------------------

#[test]
fn help_shows_available_commands() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gdtk"));
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("recache"))
        .stdout(predicate::str::contains("versions"))
        .stdout(predicate::str::contains("GDTK_HOME"));
}

#[test]
fn install_help_shows_recache_flag() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gdtk"));
    cmd.arg("install").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--recache"))
        .stdout(predicate::str::contains("[default: latest]"));
}

#[test]
fn unknown_architecture_exits_with_usage_code() {
    let home = assert_fs::TempDir::new().unwrap();

    gdtk(&home)
        .args(["install", "3.1", "stable", "amiga"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown architecture: amiga"));
}

#[test]
fn unknown_architecture_is_checked_before_network() {
    let home = assert_fs::TempDir::new().unwrap();

    gdtk(&home)
        .args(["path", "latest", "stable", "beos"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("beos"))
        .stderr(predicate::str::contains("catalog").not());
}

// -----------------------------------------------------------------------------
// Local commands
// -----------------------------------------------------------------------------

#[test]
fn list_on_fresh_home_shows_empty_message() {
    let home = assert_fs::TempDir::new().unwrap();

    gdtk(&home)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No binaries installed"));

    home.child("godot_bin").child("manifest.json").assert(predicate::path::exists());
}

#[test]
fn list_shows_seeded_binary() {
    let home = assert_fs::TempDir::new().unwrap();
    seed_installed_binary(&home);

    gdtk(&home)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("3.1"))
        .stdout(predicate::str::contains("linux-64"))
        .stdout(predicate::str::contains("[missing]").not());
}

#[test]
fn list_flags_missing_file() {
    let home = assert_fs::TempDir::new().unwrap();
    seed_installed_binary(&home);
    std::fs::remove_file(home.child("godot_bin").child(BINARY_NAME).path()).unwrap();

    gdtk(&home)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("[missing]"));
}

#[test]
fn path_prints_installed_binary_offline() {
    let home = assert_fs::TempDir::new().unwrap();
    seed_installed_binary(&home);

    gdtk(&home)
        .args(["path", "3.1", "stable", "linux"])
        .assert()
        .success()
        .stdout(predicate::str::contains(BINARY_NAME));
}

#[test]
fn path_fails_for_missing_binary() {
    let home = assert_fs::TempDir::new().unwrap();

    gdtk(&home)
        .args(["path", "3.1", "stable", "linux"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is not installed"));
}

#[test]
fn uninstall_removes_file_and_entry() {
    let home = assert_fs::TempDir::new().unwrap();
    seed_installed_binary(&home);

    gdtk(&home)
        .args(["uninstall", "3.1", "stable", "linux"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed Godot 3.1"));

    home.child("godot_bin").child(BINARY_NAME).assert(predicate::path::missing());
    home.child("godot_bin")
        .child("manifest.json")
        .assert(predicate::str::contains("3.1").not());
}

#[test]
fn uninstall_rejects_latest() {
    let home = assert_fs::TempDir::new().unwrap();

    gdtk(&home)
        .args(["uninstall", "latest"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid query"));
}

#[test]
fn corrupt_manifest_is_reported() {
    let home = assert_fs::TempDir::new().unwrap();
    home.child("godot_bin").child("manifest.json").write_str("{ not json").unwrap();

    gdtk(&home)
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("storage error"));
}

// -----------------------------------------------------------------------------
// Catalog commands
// -----------------------------------------------------------------------------

#[test]
fn versions_without_server_or_cache_fails() {
    let home = assert_fs::TempDir::new().unwrap();

    gdtk(&home)
        .arg("versions")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("catalog refresh failed"));
}

#[test]
fn recache_without_server_fails() {
    let home = assert_fs::TempDir::new().unwrap();

    gdtk(&home)
        .arg("recache")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("catalog refresh failed"));

    home.child("cache.json")
        .assert(predicate::str::contains("\"versions\""));
}

#[test]
fn install_without_server_fails() {
    let home = assert_fs::TempDir::new().unwrap();

    gdtk(&home)
        .args(["install", "3.1", "stable", "linux"])
        .assert()
        .failure();

    home.child("godot_bin").child(BINARY_NAME).assert(predicate::path::missing());
}

// -----------------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------------

#[test]
fn invalid_config_file_is_reported() {
    let home = assert_fs::TempDir::new().unwrap();
    home.child("gdtk.toml").write_str("[remote\nbase_url =").unwrap();

    gdtk(&home)
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config error"));
}
