//! Platform detection and release asset selection

use std::path::PathBuf;

use once_cell::sync::OnceCell;

use crate::install::error::{InstallError, Result};

/// Operating systems with a published core package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

/// Release package and the binary it carries for one platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformAsset {
    pub platform: Platform,
    /// File name of the zip in the release (e.g., "Xray-linux-64.zip")
    pub archive: &'static str,
    /// Member to pull out of the zip
    pub binary: &'static str,
}

/// Asset table, one entry per platform
pub static PLATFORM_ASSETS: [PlatformAsset; 3] = [
    PlatformAsset {
        platform: Platform::Windows,
        archive: "Xray-windows-64.zip",
        binary: "xray.exe",
    },
    PlatformAsset {
        platform: Platform::MacOs,
        archive: "Xray-macos-64.zip",
        binary: "xray",
    },
    PlatformAsset {
        platform: Platform::Linux,
        archive: "Xray-linux-64.zip",
        binary: "xray",
    },
];

/// Global cache for platform detection (initialized once, used everywhere)
static PLATFORM_CACHE: OnceCell<Platform> = OnceCell::new();

impl Platform {
    /// Detect current platform (cached after first call)
    pub fn detect() -> Result<Self> {
        PLATFORM_CACHE
            .get_or_try_init(|| Self::from_os(std::env::consts::OS))
            .copied()
    }

    /// Map a `std::env::consts::OS` value to a platform
    pub fn from_os(os: &str) -> Result<Self> {
        match os {
            "windows" => Ok(Platform::Windows),
            "macos" => Ok(Platform::MacOs),
            "linux" => Ok(Platform::Linux),
            other => Err(InstallError::UnsupportedPlatform(other.to_string())),
        }
    }

    pub fn asset(&self) -> &'static PlatformAsset {
        PLATFORM_ASSETS
            .iter()
            .find(|asset| asset.platform == *self)
            .unwrap_or_else(|| unreachable!("PLATFORM_ASSETS covers every platform"))
    }

    /// Where the installed binary lives when the config does not override it
    pub fn default_destination(&self) -> PathBuf {
        match self {
            Platform::Windows => {
                let program_files = std::env::var_os("ProgramFiles")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(r"C:\Program Files"));
                program_files.join("Xstream").join(self.asset().binary)
            }
            Platform::MacOs => PathBuf::from("/usr/local/bin").join(self.asset().binary),
            Platform::Linux => PathBuf::from("/opt/bin").join(self.asset().binary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_platform_has_exactly_one_asset() {
        for platform in [Platform::Windows, Platform::MacOs, Platform::Linux] {
            let count = PLATFORM_ASSETS.iter().filter(|a| a.platform == platform).count();
            assert_eq!(count, 1, "{platform:?}");
            assert_eq!(platform.asset().platform, platform);
        }
    }

    #[test]
    fn binary_names_follow_platform_conventions() {
        assert_eq!(Platform::Windows.asset().binary, "xray.exe");
        assert_eq!(Platform::MacOs.asset().binary, "xray");
        assert_eq!(Platform::Linux.asset().archive, "Xray-linux-64.zip");
    }

    #[test]
    fn unix_destinations() {
        assert_eq!(Platform::MacOs.default_destination(), PathBuf::from("/usr/local/bin/xray"));
        assert_eq!(Platform::Linux.default_destination(), PathBuf::from("/opt/bin/xray"));
        assert!(Platform::Windows.default_destination().ends_with("Xstream/xray.exe"));
    }

    #[test]
    fn unknown_os_is_rejected() {
        assert!(matches!(
            Platform::from_os("freebsd"),
            Err(InstallError::UnsupportedPlatform(os)) if os == "freebsd"
        ));
        assert_eq!(Platform::from_os("macos").unwrap(), Platform::MacOs);
    }
}
