//! Xray core installation library
//!
//! Downloads the platform's release package with resume support and installs
//! the core binary from it.

pub mod core;
mod detection;
pub mod download;
pub mod error;
mod orchestration;

// Public exports
pub use detection::{InstallationState, check_installation_state};
pub use download::{
    DownloadOutcome, Downloader, Platform, PlatformAsset, extract_binary, extract_binary_blocking,
    is_downloading,
};
pub use error::InstallError;
pub use orchestration::{InstallPlan, install_core};

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::config::InstallerConfig;
use self::core::InstallProgress;
use error::Result;

/// Ensure the core is installed, running installation if needed
///
/// # Behavior
/// - `NotInstalled` → run full installation
/// - `PartiallyInstalled` → run full installation (repair mode)
/// - `FullyInstalled` → return immediately unless `force` is set
///
/// # Returns
/// The installed binary path.
pub async fn ensure_installed(
    config: &InstallerConfig,
    force: bool,
    progress_tx: Option<mpsc::Sender<InstallProgress>>,
) -> Result<PathBuf> {
    let platform = Platform::detect()?;
    let plan = InstallPlan::new(config, platform)?;
    let state = check_installation_state(&plan.destination);

    match state {
        InstallationState::FullyInstalled if !force => {
            log::info!("Installation verified at {}", plan.destination.display());
            Ok(plan.destination)
        }
        _ => {
            log::info!("Installation required: {:?}", state);
            install_core(config, platform, progress_tx).await
        }
    }
}
