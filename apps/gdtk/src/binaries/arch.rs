//! Target architecture identification for Godot binaries.
//!
//! Maps the running host, or a user-supplied alias, onto the closed set of
//! targets the distribution server publishes builds for. Each target knows the
//! filename suffix the server uses and how the local binary is named.
//!
//! ## Supported Targets
//!
//! | Id                  | Remote suffix       |
//! |---------------------|---------------------|
//! | `linux-32`          | `x11.32`            |
//! | `linux-64`          | `x11.64`            |
//! | `linux-headless-64` | `linux_headless.64` |
//! | `linux-server-64`   | `linux_server.64`   |
//! | `windows-32`        | `win32.exe`         |
//! | `windows-64`        | `win64.exe`         |
//! | `macos-64`          | `osx.64`            |

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::errors::GdtkError;

/// Product name used as the prefix of every binary filename.
pub const PRODUCT_NAME: &str = "Godot";

/// Suffix returned for targets the server does not publish.
pub const UNKNOWN_SUFFIX: &str = "unknown";

/// Case-insensitive aliases accepted on the command line.
const ALIASES: &[(&str, Architecture)] = &[
    ("linux", Architecture::Linux64),
    ("linux64", Architecture::Linux64),
    ("linux32", Architecture::Linux32),
    ("windows", Architecture::Windows64),
    ("windows64", Architecture::Windows64),
    ("win64", Architecture::Windows64),
    ("windows32", Architecture::Windows32),
    ("win32", Architecture::Windows32),
    ("osx", Architecture::Macos64),
    ("macos", Architecture::Macos64),
];

/// A platform/bitness/variant combination that Godot binaries are built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Architecture {
    /// Linux desktop, 32-bit.
    Linux32,
    /// Linux desktop, 64-bit.
    Linux64,
    /// Linux headless build, 64-bit.
    LinuxHeadless64,
    /// Linux dedicated server build, 64-bit.
    LinuxServer64,
    /// Windows, 32-bit.
    Windows32,
    /// Windows, 64-bit.
    Windows64,
    /// macOS, 64-bit.
    Macos64,
    /// Host or id that maps to no published target.
    Unknown,
}

impl Architecture {
    /// Every target the server publishes, in a stable order.
    pub const SUPPORTED: [Architecture; 7] = [
        Self::Linux32,
        Self::Linux64,
        Self::LinuxHeadless64,
        Self::LinuxServer64,
        Self::Windows32,
        Self::Windows64,
        Self::Macos64,
    ];

    /// Maps an OS name and bitness onto a target.
    ///
    /// `os` uses the names of [`std::env::consts::OS`]. Hosts that are not
    /// Linux, Windows or macOS map to [`Architecture::Unknown`].
    #[must_use]
    pub fn resolve(os: &str, is_64bit: bool) -> Self {
        match (os, is_64bit) {
            ("linux", true) => Self::Linux64,
            ("linux", false) => Self::Linux32,
            ("windows", true) => Self::Windows64,
            ("windows", false) => Self::Windows32,
            ("macos", _) => Self::Macos64,
            _ => Self::Unknown,
        }
    }

    /// Detects the target of the running host.
    #[must_use]
    pub fn detect() -> Self {
        Self::resolve(std::env::consts::OS, std::env::consts::ARCH.ends_with("64"))
    }

    /// Looks up a user-supplied alias, falling back to host detection when absent.
    ///
    /// # Errors
    ///
    /// Returns [`GdtkError::UnknownArchitecture`] if the alias matches nothing.
    pub fn from_user_string(alias: Option<&str>) -> Result<Self, GdtkError> {
        let Some(alias) = alias else {
            return Ok(Self::detect());
        };

        let lowered = alias.trim().to_lowercase();
        ALIASES
            .iter()
            .find(|(name, _)| *name == lowered)
            .map(|(_, arch)| *arch)
            .or_else(|| Self::from_id(&lowered))
            .filter(|arch| *arch != Self::Unknown)
            .ok_or_else(|| GdtkError::unknown_architecture(alias))
    }

    /// Parses a canonical id such as `linux-64`.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::SUPPORTED
            .into_iter()
            .chain([Self::Unknown])
            .find(|arch| arch.as_str() == id)
    }

    /// Maps a remote filename suffix back to its target.
    #[must_use]
    pub fn from_remote_suffix(suffix: &str) -> Self {
        Self::SUPPORTED
            .into_iter()
            .find(|arch| arch.remote_suffix() == suffix)
            .unwrap_or(Self::Unknown)
    }

    /// Guesses the target of a binary from the suffix after its last `_`,
    /// as in `Godot_v3.1-stable_x11.64`.
    #[must_use]
    pub fn from_binary_name(name: &str) -> Self {
        name.rsplit_once('_')
            .map_or(Self::Unknown, |(_, suffix)| Self::from_remote_suffix(suffix))
    }

    /// Returns the canonical id, used in stores and on the command line.
    #[must_use = "returns the id string without side effects"]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux32 => "linux-32",
            Self::Linux64 => "linux-64",
            Self::LinuxHeadless64 => "linux-headless-64",
            Self::LinuxServer64 => "linux-server-64",
            Self::Windows32 => "windows-32",
            Self::Windows64 => "windows-64",
            Self::Macos64 => "macos-64",
            Self::Unknown => "unknown",
        }
    }

    /// Returns the suffix the distribution server appends to filenames.
    #[must_use = "returns the suffix string without side effects"]
    pub fn remote_suffix(self) -> &'static str {
        match self {
            Self::Linux32 => "x11.32",
            Self::Linux64 => "x11.64",
            Self::LinuxHeadless64 => "linux_headless.64",
            Self::LinuxServer64 => "linux_server.64",
            Self::Windows32 => "win32.exe",
            Self::Windows64 => "win64.exe",
            Self::Macos64 => "osx.64",
            Self::Unknown => UNKNOWN_SUFFIX,
        }
    }

    /// Builds the expected binary filename: `Godot_v<version>-<release>_<suffix>`.
    ///
    /// This mirrors the upstream naming convention but is not guaranteed to
    /// match what the server actually hosts.
    #[must_use]
    pub fn canonical_binary_name(self, version: &str, release: &str) -> String {
        format!(
            "{PRODUCT_NAME}_v{version}-{release}_{}",
            self.remote_suffix()
        )
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl Serialize for Architecture {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Architecture {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        Self::from_id(&id)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown architecture id: {id}")))
    }
}
