use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::install::error::{InstallError, Result};

/// Installer configuration (mirrors the released defaults).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Release download root; `{base_url}/{version}/{archive}` is fetched
    pub base_url: String,
    pub version: String,
    /// Where partial archives are kept between runs (OS temp dir if unset)
    pub temp_dir: Option<PathBuf>,
    /// Install location override (platform default if unset)
    pub destination: Option<PathBuf>,
    pub connect_timeout_secs: Option<u64>,
    /// Abort when the body stalls for this long
    pub inactivity_timeout_secs: Option<u64>,
    pub user_agent: String,
    /// Ignore HTTP(S)_PROXY from the environment
    pub disable_proxy: bool,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://github.com/XTLS/Xray-core/releases/download".into(),
            version: "v25.8.3".into(),
            temp_dir: None,
            destination: None,
            connect_timeout_secs: Some(30),
            inactivity_timeout_secs: Some(300),
            user_agent: concat!("xcore-installer/", env!("CARGO_PKG_VERSION")).into(),
            disable_proxy: false,
        }
    }
}

impl InstallerConfig {
    /// `<config_dir>/xcore/installer.toml`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| InstallError::Config("could not determine config directory".into()))?;
        Ok(config_dir.join("xcore").join("installer.toml"))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| InstallError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| InstallError::Config(e.to_string()))
    }

    /// Read `path`, writing the defaults there first if it does not exist
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("Config not found at {}, creating default configuration", path.display());

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    InstallError::io(format!("Failed to create {}", parent.display()), e)
                })?;
            }
            let defaults = Self::default();
            fs::write(path, defaults.to_toml()?)
                .map_err(|e| InstallError::io(format!("Failed to write {}", path.display()), e))?;
            return Ok(defaults);
        }

        let text = fs::read_to_string(path)
            .map_err(|e| InstallError::io(format!("Failed to read {}", path.display()), e))?;
        let config = Self::from_toml(&text)?;
        log::info!("Using config from: {}", path.display());
        Ok(config)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
