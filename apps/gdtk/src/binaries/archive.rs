//! Unpacking of downloaded builds.
//!
//! Godot publishes each build as a ZIP holding a single executable. Some
//! mirrors serve tarballs, and the nightly Linux build is a bare `.AppImage`.
//! Anything that is not a recognised archive is treated as the payload
//! itself.

use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use std::path::{Component, Path, PathBuf};
use tar::Archive;

/// Archive formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    /// Detects the format from the file name, or `None` for a bare payload.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lowered = name.to_lowercase();
        if lowered.ends_with(".zip") {
            Some(Self::Zip)
        } else if lowered.ends_with(".tar.gz") || lowered.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

/// Extracts `archive_path` into `dest_dir`, creating it if needed.
///
/// Entry paths are kept as-is; no common root folder is stripped.
///
/// # Errors
///
/// Returns an error if the format is not recognised, the archive is corrupt,
/// an entry would escape `dest_dir`, or a file cannot be written.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match ArchiveKind::from_file_name(&name) {
        Some(ArchiveKind::Zip) => extract_zip(archive_path, dest_dir),
        Some(ArchiveKind::TarGz) => extract_tar_gz(archive_path, dest_dir),
        None => bail!("Not a supported archive: {}", archive_path.display()),
    }
}

fn ensure_contained(entry_path: &Path) -> Result<()> {
    if entry_path.is_absolute()
        || entry_path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    {
        bail!(
            "Refusing to extract path with parent directory or absolute reference: {}",
            entry_path.display()
        );
    }
    Ok(())
}

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {}", archive_path.display()))?;

    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read archive entry {i}"))?;
        let entry_path = entry
            .enclosed_name()
            .with_context(|| format!("Invalid entry path in archive: {}", entry.name()))?;
        ensure_contained(&entry_path)?;

        let output_path = dest_dir.join(&entry_path);
        if entry.is_dir() {
            std::fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let mut outfile = std::fs::File::create(&output_path)
            .with_context(|| format!("Failed to create file: {}", output_path.display()))?;
        std::io::copy(&mut entry, &mut outfile)
            .with_context(|| format!("Failed to extract: {}", output_path.display()))?;
    }

    Ok(())
}

fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read tar entries: {}", archive_path.display()))?
    {
        let mut entry = entry
            .with_context(|| format!("Failed to read tar entry: {}", archive_path.display()))?;
        let entry_path = entry
            .path()
            .context("Failed to get entry path")?
            .into_owned();
        ensure_contained(&entry_path)?;

        let output_path = dest_dir.join(&entry_path);
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        entry
            .unpack(&output_path)
            .with_context(|| format!("Failed to extract: {}", output_path.display()))?;
    }

    Ok(())
}

/// Picks the binary out of an extraction directory.
///
/// Builds ship one file per archive, so the top-level entries are sorted by
/// name and the first one wins. Archives with several entries are not
/// inspected further; the chosen entry may be a directory, which
/// registration then rejects.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or is empty.
pub fn find_payload(extract_dir: &Path) -> Result<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(extract_dir)
        .with_context(|| format!("Failed to read directory: {}", extract_dir.display()))?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect();
    entries.sort();

    if entries.len() > 1 {
        tracing::warn!(
            count = entries.len(),
            chosen = %entries[0].display(),
            "archive has several top-level entries, using the first"
        );
    }

    entries
        .into_iter()
        .next()
        .with_context(|| format!("Archive contained no files: {}", extract_dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binaries::test_support::{tar_gz_archive, zip_archive};
    use assert_fs::prelude::*;

    #[test]
    fn detects_kind_from_name() {
        assert_eq!(
            ArchiveKind::from_file_name("Godot_v3.1-stable_x11.64.zip"),
            Some(ArchiveKind::Zip)
        );
        assert_eq!(
            ArchiveKind::from_file_name("godot.TAR.GZ"),
            Some(ArchiveKind::TarGz)
        );
        assert_eq!(ArchiveKind::from_file_name("godot.tgz"), Some(ArchiveKind::TarGz));
        assert_eq!(
            ArchiveKind::from_file_name("Godot-nightly-abc1234_x11.64.AppImage"),
            None
        );
    }

    #[test]
    fn zip_single_file_extracts_at_top_level() {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.child("build.zip");
        archive
            .write_binary(&zip_archive(&[("godot-binary", b"ELF")]))
            .unwrap();
        let out = temp.child("out");

        extract_archive(archive.path(), out.path()).unwrap();

        out.child("godot-binary").assert("ELF");
        assert_eq!(find_payload(out.path()).unwrap(), out.path().join("godot-binary"));
    }

    #[test]
    fn tar_gz_extracts() {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.child("build.tar.gz");
        archive
            .write_binary(&tar_gz_archive(&[("godot-binary", b"ELF")]))
            .unwrap();
        let out = temp.child("out");

        extract_archive(archive.path(), out.path()).unwrap();
        out.child("godot-binary").assert("ELF");
    }

    #[test]
    fn common_root_is_not_stripped() {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.child("build.zip");
        archive
            .write_binary(&zip_archive(&[
                ("Godot.app/", b""),
                ("Godot.app/Contents/MacOS/Godot", b"MACHO"),
            ]))
            .unwrap();
        let out = temp.child("out");

        extract_archive(archive.path(), out.path()).unwrap();

        let payload = find_payload(out.path()).unwrap();
        assert_eq!(payload, out.path().join("Godot.app"));
        assert!(payload.is_dir());
    }

    #[test]
    fn first_entry_by_name_wins_for_multi_file_archives() {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.child("build.zip");
        archive
            .write_binary(&zip_archive(&[("zz-readme.txt", b"doc"), ("godot", b"ELF")]))
            .unwrap();
        let out = temp.child("out");

        extract_archive(archive.path(), out.path()).unwrap();
        assert_eq!(find_payload(out.path()).unwrap(), out.path().join("godot"));
    }

    #[test]
    fn empty_directory_has_no_payload() {
        let temp = assert_fs::TempDir::new().unwrap();
        let err = find_payload(temp.path()).unwrap_err();
        assert!(err.to_string().contains("no files"));
    }

    #[test]
    fn corrupt_zip_is_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.child("build.zip");
        archive.write_str("<html>404</html>").unwrap();

        let err = extract_archive(archive.path(), temp.child("out").path()).unwrap_err();
        assert!(err.to_string().contains("Failed to read ZIP archive"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("build.AppImage");
        file.write_str("ELF").unwrap();
        assert!(extract_archive(file.path(), temp.child("out").path()).is_err());
    }

    #[test]
    fn parent_references_are_refused() {
        assert!(ensure_contained(Path::new("../escape")).is_err());
        assert!(ensure_contained(Path::new("/abs")).is_err());
        assert!(ensure_contained(Path::new("ok/file")).is_ok());
    }
}
