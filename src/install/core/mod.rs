//! Core installer structures shared by the download and extraction routines

mod progress;

pub use progress::{
    DownloadMetadata, DownloadPhase, InstallProgress, PROGRESS_INTERVAL, ProgressThrottle,
};
