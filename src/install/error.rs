//! Installer error type
//!
//! Every failure of the download and extraction routines surfaces as one of
//! these variants. Nothing here retries; callers decide what to do next.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    /// Request construction, connection, or body read failure
    #[error("network request for {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Anything other than 200/206 (or a 416 that does not mean "complete")
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { url: String, status: StatusCode },

    /// 206 response whose Content-Range does not start at the requested offset
    #[error("server resumed {url} at byte {actual}, expected {expected}")]
    RangeMismatch {
        url: String,
        expected: u64,
        actual: u64,
    },

    #[error("no data received from {url} for {idle:?}")]
    Timeout { url: String, idle: Duration },

    /// Local filesystem failure; a partial download is left on disk
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open archive {}: {source}", .path.display())]
    ArchiveOpen {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{name} not found in archive {}", .archive.display())]
    MemberNotFound { name: String, archive: PathBuf },

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl InstallError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn network(url: &str, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.to_string(),
            source,
        }
    }

    /// True for the variants that leave a resumable partial file behind
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::Io { .. }
        )
    }
}

pub type Result<T, E = InstallError> = std::result::Result<T, E>;
