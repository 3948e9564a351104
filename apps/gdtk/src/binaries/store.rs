//! JSON persistence shared by the catalog and the manifest.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::errors::GdtkError;

/// Reads and parses a JSON store.
///
/// # Errors
///
/// Returns [`GdtkError::Storage`] if the file cannot be read or does not
/// parse. A corrupt store is never replaced silently.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, GdtkError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        GdtkError::storage_with_source(format!("Failed to read {}", path.display()), e)
    })?;
    serde_json::from_str(&content).map_err(|e| {
        GdtkError::storage_with_source(format!("Corrupt store at {}", path.display()), e)
    })
}

/// Serializes `value` and replaces the store at `path`.
///
/// The JSON is written to a sibling `.tmp` file first and renamed over the
/// target, so readers never see a half-written store.
///
/// # Errors
///
/// Returns [`GdtkError::Storage`] if the parent directory cannot be created or
/// the file cannot be written.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), GdtkError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            GdtkError::storage_with_source(
                format!("Failed to create directory {}", parent.display()),
                e,
            )
        })?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|e| {
        GdtkError::storage_with_source(format!("Failed to serialize {}", path.display()), e)
    })?;

    let temp = path.with_extension("json.tmp");
    std::fs::write(&temp, json).map_err(|e| {
        GdtkError::storage_with_source(format!("Failed to write {}", temp.display()), e)
    })?;
    std::fs::rename(&temp, path).map_err(|e| {
        GdtkError::storage_with_source(format!("Failed to replace {}", path.display()), e)
    })
}
