//! Core package installation flow
//!
//! Resolves the release URL and paths for a platform, downloads the package
//! with resume, then extracts the binary into place.

use std::path::PathBuf;

use log::{debug, info, warn};
use reqwest::StatusCode;
use tokio::sync::mpsc;

use super::core::{DownloadPhase, InstallProgress};
use super::download::{Downloader, Platform, extract_binary};
use super::error::{InstallError, Result};
use crate::config::InstallerConfig;

/// Everything needed to install the core on one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub url: String,
    /// Partial downloads live here between runs
    pub archive_path: PathBuf,
    pub binary_name: &'static str,
    pub destination: PathBuf,
}

impl InstallPlan {
    pub fn new(config: &InstallerConfig, platform: Platform) -> Result<Self> {
        let asset = platform.asset();
        let url = format!(
            "{}/{}/{}",
            config.base_url.trim_end_matches('/'),
            config.version,
            asset.archive
        );

        let parsed = reqwest::Url::parse(&url)
            .map_err(|e| InstallError::Config(format!("invalid download URL {url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(InstallError::Config(format!(
                "download URL must be http(s), got {url}"
            )));
        }

        // Versioned so a new release never resumes onto an old partial file
        let archive_path = config
            .temp_dir()
            .join(format!("xcore-{}", config.version))
            .join(asset.archive);

        let destination = config
            .destination
            .clone()
            .unwrap_or_else(|| platform.default_destination());

        Ok(Self {
            url,
            archive_path,
            binary_name: asset.binary,
            destination,
        })
    }
}

async fn notify_phase(
    progress_tx: Option<&mpsc::Sender<InstallProgress>>,
    binary_name: &str,
    phase: DownloadPhase,
) {
    if let Some(tx) = progress_tx {
        let event = InstallProgress::download(binary_name.to_string(), 0, None, phase);
        if tx.send(event).await.is_err() {
            debug!("Progress receiver dropped before {:?}", phase);
        }
    }
}

/// Download and install the core binary for `platform`
///
/// Returns the installed binary path. A failed download leaves the partial
/// archive in the temp directory for the next run to resume.
pub async fn install_core(
    config: &InstallerConfig,
    platform: Platform,
    progress_tx: Option<mpsc::Sender<InstallProgress>>,
) -> Result<PathBuf> {
    let plan = InstallPlan::new(config, platform)?;
    info!("Installing {} for {:?} to {}", plan.binary_name, platform, plan.destination.display());

    if let Some(parent) = plan.archive_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| InstallError::io(format!("Failed to create {}", parent.display()), e))?;
    }

    let mut downloader = Downloader::from_config(config)?;
    if let Some(tx) = &progress_tx {
        downloader = downloader.with_progress(tx.clone(), plan.binary_name);
    }
    let outcome = match downloader.download(&plan.url, &plan.archive_path).await {
        // Leftover archive longer than the remote file can never be resumed
        Err(InstallError::UnexpectedStatus { status, .. })
            if status == StatusCode::RANGE_NOT_SATISFIABLE =>
        {
            warn!(
                "Discarding stale partial archive {}",
                plan.archive_path.display()
            );
            tokio::fs::remove_file(&plan.archive_path).await.map_err(|e| {
                InstallError::io(format!("Failed to remove {}", plan.archive_path.display()), e)
            })?;
            downloader.download(&plan.url, &plan.archive_path).await?
        }
        result => result?,
    };
    debug!("Archive ready: {} ({} bytes)", plan.archive_path.display(), outcome.bytes());

    notify_phase(progress_tx.as_ref(), plan.binary_name, DownloadPhase::Extracting).await;
    let installed = extract_binary(&plan.archive_path, plan.binary_name, &plan.destination).await?;

    if let Err(e) = tokio::fs::remove_file(&plan.archive_path).await {
        warn!("Failed to remove {}: {}", plan.archive_path.display(), e);
    }

    notify_phase(progress_tx.as_ref(), plan.binary_name, DownloadPhase::Complete).await;
    Ok(installed)
}
