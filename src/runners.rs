//! Command runners for the installer binary
//!
//! Each runner prints human-facing status lines to stdout; structured detail
//! goes through `log`.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use xcore_installer::install::core::{DownloadPhase, InstallProgress};
use xcore_installer::install::{
    self, DownloadOutcome, Downloader, InstallPlan, InstallationState, Platform,
};
use xcore_installer::InstallerConfig;

/// Print progress events until every sender is dropped
fn spawn_progress_printer(mut rx: mpsc::Receiver<InstallProgress>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            match progress.download_metadata.as_ref().map(|m| m.phase) {
                Some(DownloadPhase::Downloading) | Some(DownloadPhase::Extracting) | None => {
                    println!("{}", progress.message);
                }
                Some(DownloadPhase::Complete) => {}
            }
        }
    })
}

/// Install (or repair) the core for the current platform
pub async fn run_install(config: &InstallerConfig, force: bool) -> Result<()> {
    println!("Xray core installation");
    println!("Platform: {}\n", std::env::consts::OS);

    let (tx, rx) = mpsc::channel::<InstallProgress>(100);
    let progress_task = spawn_progress_printer(rx);

    let result = install::ensure_installed(config, force, Some(tx)).await;

    // Sender is dropped with the call above; drain what is left
    progress_task.await.ok();

    let installed = result.context("Failed to install Xray core")?;
    println!("Xray installed at: {}", installed.display());
    Ok(())
}

/// Fetch a single URL with resume
pub async fn run_download(config: &InstallerConfig, url: &str, dest: &Path) -> Result<()> {
    let (tx, rx) = mpsc::channel::<InstallProgress>(100);
    let progress_task = spawn_progress_printer(rx);

    let label = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());

    let outcome = Downloader::from_config(config)?
        .with_progress(tx, &label)
        .download(url, dest)
        .await;
    progress_task.await.ok();

    match outcome.with_context(|| format!("Failed to download {url}"))? {
        DownloadOutcome::AlreadyComplete { bytes } => {
            println!("Already complete: {} ({} bytes)", dest.display(), bytes);
        }
        DownloadOutcome::Completed { bytes, resumed_from } if resumed_from > 0 => {
            println!(
                "Download completed: {} ({} bytes, resumed at {})",
                dest.display(),
                bytes,
                resumed_from
            );
        }
        DownloadOutcome::Completed { bytes, .. } => {
            println!("Download completed: {} ({} bytes)", dest.display(), bytes);
        }
    }
    Ok(())
}

/// Pull one binary out of a local zip
pub async fn run_extract(archive: &Path, name: &str, dest: &Path) -> Result<()> {
    let installed = install::extract_binary(archive, name, dest)
        .await
        .with_context(|| format!("Failed to extract {name} from {}", archive.display()))?;
    println!("Xray extracted to: {}", installed.display());
    Ok(())
}

/// Report whether the core is installed at the configured destination
pub fn run_status(config: &InstallerConfig) -> Result<InstallationState> {
    let platform = Platform::detect()?;
    let plan = InstallPlan::new(config, platform)?;
    let state = install::check_installation_state(&plan.destination);

    match state {
        InstallationState::FullyInstalled => {
            println!("installed: {}", plan.destination.display())
        }
        InstallationState::PartiallyInstalled => {
            println!("not executable: {}", plan.destination.display())
        }
        InstallationState::NotInstalled => {
            println!("not installed: {}", plan.destination.display())
        }
    }
    Ok(state)
}
