//! Installation progress tracking with download metadata

use std::time::{Duration, Instant};

/// Minimum spacing between two `Downloading` notifications
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Download phase tracking for the core package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    Downloading, // Streaming archive bytes to the temp file
    Extracting,  // Pulling the binary out of the archive
    Complete,    // Binary installed at its destination
}

/// Metadata for tracking a single download
#[derive(Debug, Clone)]
pub struct DownloadMetadata {
    /// Binary name being installed (e.g., "xray", "xray.exe")
    pub binary_name: String,

    /// Bytes on disk so far, including bytes present before a resume
    pub bytes_downloaded: u64,

    /// Total bytes expected, when the server told us
    pub total_bytes: Option<u64>,

    pub phase: DownloadPhase,
}

/// Installation progress tracking
#[derive(Debug, Clone)]
pub struct InstallProgress {
    pub step: String,
    pub progress: f32, // 0.0 to 1.0
    pub message: String,

    /// Download-specific metadata (only set during the download phases)
    pub download_metadata: Option<DownloadMetadata>,
}

impl InstallProgress {
    /// Create download progress with metadata
    pub fn download(
        binary_name: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
        phase: DownloadPhase,
    ) -> Self {
        let fraction = match total_bytes {
            Some(total) if total > 0 => {
                (bytes_downloaded as f64 / total as f64).min(1.0) as f32
            }
            _ => 0.0,
        };

        let message = match phase {
            DownloadPhase::Downloading => match total_bytes {
                Some(total) if total > 0 => format!(
                    "Download progress: {:.2}% ({}/{} bytes)",
                    fraction as f64 * 100.0,
                    bytes_downloaded,
                    total
                ),
                _ => format!("Downloaded {} bytes", bytes_downloaded),
            },
            DownloadPhase::Extracting => format!("Extracting {}...", binary_name),
            DownloadPhase::Complete => format!("{} complete", binary_name),
        };

        let progress = match phase {
            DownloadPhase::Downloading => fraction,
            DownloadPhase::Extracting | DownloadPhase::Complete => 1.0,
        };

        Self {
            step: "download".to_string(),
            progress,
            message,
            download_metadata: Some(DownloadMetadata {
                binary_name,
                bytes_downloaded,
                total_bytes,
                phase,
            }),
        }
    }
}

/// Rate limiter for progress notifications
///
/// The first notification is allowed once `interval` has elapsed since the
/// throttle was created, then at most once per `interval` after that.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last: Instant,
}

impl ProgressThrottle {
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last: start,
        }
    }

    /// Returns true (and rearms) when a notification may be emitted at `now`
    pub fn ready(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }
}
