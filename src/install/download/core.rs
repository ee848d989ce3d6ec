//! Resumable HTTP download with progress tracking
//!
//! The partially written file is the only resume record: its length is the
//! resume offset for the next attempt. Bytes are appended at that offset only
//! when the server confirms partial content; a full 200 body restarts the file.

use std::io::SeekFrom;
use std::path::Path;
use std::time::{Duration, Instant};

use futures::StreamExt;
use log::{debug, info, warn};
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, HeaderMap, RANGE};
use reqwest::{Client, StatusCode};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::timeout;

use super::state::DownloadingGuard;
use crate::config::InstallerConfig;
use crate::install::core::{DownloadPhase, InstallProgress, PROGRESS_INTERVAL, ProgressThrottle};
use crate::install::error::{InstallError, Result};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300); // 5 min no data

/// How a download call finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Body streamed to disk; `resumed_from` is 0 for a fresh or restarted transfer
    Completed { bytes: u64, resumed_from: u64 },
    /// The file on disk already held the whole resource
    AlreadyComplete { bytes: u64 },
}

impl DownloadOutcome {
    pub fn bytes(&self) -> u64 {
        match *self {
            Self::Completed { bytes, .. } | Self::AlreadyComplete { bytes } => bytes,
        }
    }
}

/// Parsed `Content-Range` value; `None` fields stand for `*`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ContentRange {
    pub start: Option<u64>,
    pub total: Option<u64>,
}

/// Parse `bytes 100-199/200`, `bytes */200` and `bytes 0-99/*`
pub(crate) fn parse_content_range(value: &str) -> Option<ContentRange> {
    let spec = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = spec.split_once('/')?;

    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse().ok()?),
    };
    let start = match range.trim() {
        "*" => None,
        r => {
            let (s, _) = r.split_once('-')?;
            Some(s.trim().parse().ok()?)
        }
    };

    Some(ContentRange { start, total })
}

/// What to do with the destination file once the response headers are in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransferPlan {
    AlreadyComplete { total: u64 },
    /// Truncate and write from byte 0
    Restart { total: Option<u64> },
    /// Seek to `offset` and append
    Resume { offset: u64, total: Option<u64> },
}

/// Reconcile the bytes already on disk with the server's answer
pub(crate) fn plan_transfer(
    url: &str,
    present: u64,
    status: StatusCode,
    headers: &HeaderMap,
) -> Result<TransferPlan> {
    let content_range = headers
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range);

    match status {
        StatusCode::OK => {
            let total = headers
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            if present > 0 {
                warn!(
                    "Server ignored range request for {} (had {} bytes), restarting from zero",
                    url, present
                );
            }
            Ok(TransferPlan::Restart { total })
        }
        StatusCode::PARTIAL_CONTENT => {
            let (start, total) = match content_range {
                Some(range) => (range.start.unwrap_or(present), range.total),
                None => (present, None),
            };
            if start != present {
                return Err(InstallError::RangeMismatch {
                    url: url.to_string(),
                    expected: present,
                    actual: start,
                });
            }
            Ok(TransferPlan::Resume {
                offset: present,
                total,
            })
        }
        StatusCode::RANGE_NOT_SATISFIABLE if present > 0 => match content_range {
            Some(ContentRange {
                total: Some(total), ..
            }) if total == present => Ok(TransferPlan::AlreadyComplete { total }),
            range => {
                warn!(
                    "Server rejected resume of {} at byte {} (remote total {:?})",
                    url,
                    present,
                    range.and_then(|r| r.total)
                );
                Err(InstallError::UnexpectedStatus {
                    url: url.to_string(),
                    status,
                })
            }
        },
        _ => Err(InstallError::UnexpectedStatus {
            url: url.to_string(),
            status,
        }),
    }
}

/// Size of the file already on disk, 0 when it does not exist
async fn existing_len(dest: &Path) -> Result<u64> {
    match tokio::fs::metadata(dest).await {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(InstallError::io(
            format!("Failed to inspect {}", dest.display()),
            e,
        )),
    }
}

/// Push buffered bytes of a failed transfer to disk so the next call resumes from them
async fn flush_partial(file: &mut tokio::fs::File, dest: &Path) {
    if let Err(e) = file.flush().await {
        warn!("Failed to flush partial download {}: {}", dest.display(), e);
    }
}

/// Resumable single-stream downloader
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    inactivity_timeout: Duration,
    progress_interval: Duration,
    progress_tx: Option<mpsc::Sender<InstallProgress>>,
    label: String,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            progress_interval: PROGRESS_INTERVAL,
            progress_tx: None,
            label: String::from("download"),
        }
    }

    /// Build a client with the configured timeouts and user agent
    pub fn from_config(config: &InstallerConfig) -> Result<Self> {
        let connect_timeout = config
            .connect_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT);

        let mut builder = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(config.user_agent.clone());
        if config.disable_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| InstallError::network(&config.base_url, e))?;

        let mut downloader = Self::new(client);
        if let Some(secs) = config.inactivity_timeout_secs {
            downloader.inactivity_timeout = Duration::from_secs(secs);
        }
        Ok(downloader)
    }

    /// Send throttled progress events to `tx`, labelled with `label`
    pub fn with_progress(mut self, tx: mpsc::Sender<InstallProgress>, label: &str) -> Self {
        self.progress_tx = Some(tx);
        self.label = label.to_string();
        self
    }

    pub fn inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Fetch `url` into `dest`, continuing from whatever `dest` already holds
    ///
    /// On failure the bytes written so far stay on disk so the next call can
    /// resume from them.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<DownloadOutcome> {
        let _downloading = DownloadingGuard::acquire();
        info!("Xray core download URL: {}", url);

        let present = existing_len(dest).await?;

        let mut request = self.client.get(url);
        if present > 0 {
            debug!("Resuming {} from byte {}", dest.display(), present);
            request = request.header(RANGE, format!("bytes={}-", present));
        }

        let response = request
            .send()
            .await
            .map_err(|e| InstallError::network(url, e))?;

        let plan = plan_transfer(url, present, response.status(), response.headers())?;
        let (offset, total) = match plan {
            TransferPlan::AlreadyComplete { total } => {
                info!("Already downloaded: {} ({} bytes)", dest.display(), total);
                return Ok(DownloadOutcome::AlreadyComplete { bytes: total });
            }
            TransferPlan::Restart { total } => (0, total),
            TransferPlan::Resume { offset, total } => (offset, total),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(dest)
            .await
            .map_err(|e| InstallError::io(format!("Failed to open {}", dest.display()), e))?;

        if offset > 0 {
            file.seek(SeekFrom::Start(offset))
                .await
                .map_err(|e| InstallError::io(format!("Failed to seek {}", dest.display()), e))?;
        } else if present > 0 {
            file.set_len(0).await.map_err(|e| {
                InstallError::io(format!("Failed to truncate {}", dest.display()), e)
            })?;
        }

        let mut stream = response.bytes_stream();
        let mut downloaded = offset;
        let mut throttle = ProgressThrottle::new(self.progress_interval, Instant::now());
        let mut progress_disabled = false;

        loop {
            let chunk = match timeout(self.inactivity_timeout, stream.next()).await {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(e))) => {
                    flush_partial(&mut file, dest).await;
                    return Err(InstallError::network(url, e));
                }
                Ok(None) => break,
                Err(_) => {
                    flush_partial(&mut file, dest).await;
                    return Err(InstallError::Timeout {
                        url: url.to_string(),
                        idle: self.inactivity_timeout,
                    });
                }
            };

            file.write_all(&chunk)
                .await
                .map_err(|e| InstallError::io(format!("Failed to write {}", dest.display()), e))?;
            downloaded += chunk.len() as u64;

            if throttle.ready(Instant::now()) {
                self.report(downloaded, total, &mut progress_disabled);
            }
        }

        file.flush()
            .await
            .map_err(|e| InstallError::io(format!("Failed to flush {}", dest.display()), e))?;

        info!("Download completed: {}", dest.display());
        Ok(DownloadOutcome::Completed {
            bytes: downloaded,
            resumed_from: offset,
        })
    }

    /// Best-effort progress: a closed channel never fails the download
    fn report(&self, downloaded: u64, total: Option<u64>, disabled: &mut bool) {
        let progress = InstallProgress::download(
            self.label.clone(),
            downloaded,
            total,
            DownloadPhase::Downloading,
        );

        let Some(tx) = &self.progress_tx else {
            info!("{}", progress.message);
            return;
        };
        if *disabled {
            return;
        }
        if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(progress) {
            warn!("Progress channel closed, continuing download without updates");
            *disabled = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(reqwest::header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn parses_content_range_forms() {
        assert_eq!(
            parse_content_range("bytes 100-199/200"),
            Some(ContentRange {
                start: Some(100),
                total: Some(200)
            })
        );
        assert_eq!(
            parse_content_range("bytes */512"),
            Some(ContentRange {
                start: None,
                total: Some(512)
            })
        );
        assert_eq!(
            parse_content_range("bytes 0-99/*"),
            Some(ContentRange {
                start: Some(0),
                total: None
            })
        );
        assert_eq!(parse_content_range("items 0-1/2"), None);
        assert_eq!(parse_content_range("bytes 0-99"), None);
        assert_eq!(parse_content_range("bytes x-99/100"), None);
    }

    #[test]
    fn full_content_restarts_even_when_bytes_present() {
        let h = headers(&[(CONTENT_LENGTH, "1000")]);
        let plan = plan_transfer("http://x", 400, StatusCode::OK, &h).unwrap();
        assert_eq!(plan, TransferPlan::Restart { total: Some(1000) });
    }

    #[test]
    fn partial_content_resumes_at_offset() {
        let h = headers(&[(CONTENT_RANGE, "bytes 400-999/1000")]);
        let plan = plan_transfer("http://x", 400, StatusCode::PARTIAL_CONTENT, &h).unwrap();
        assert_eq!(
            plan,
            TransferPlan::Resume {
                offset: 400,
                total: Some(1000)
            }
        );
    }

    #[test]
    fn partial_content_without_range_header_has_unknown_total() {
        let plan =
            plan_transfer("http://x", 10, StatusCode::PARTIAL_CONTENT, &HeaderMap::new()).unwrap();
        assert_eq!(
            plan,
            TransferPlan::Resume {
                offset: 10,
                total: None
            }
        );
    }

    #[test]
    fn partial_content_at_wrong_offset_is_rejected() {
        let h = headers(&[(CONTENT_RANGE, "bytes 0-999/1000")]);
        let err = plan_transfer("http://x", 400, StatusCode::PARTIAL_CONTENT, &h).unwrap_err();
        assert!(matches!(
            err,
            InstallError::RangeMismatch {
                expected: 400,
                actual: 0,
                ..
            }
        ));
    }

    #[test]
    fn unsatisfiable_range_on_complete_file_is_done() {
        let h = headers(&[(CONTENT_RANGE, "bytes */1000")]);
        let plan =
            plan_transfer("http://x", 1000, StatusCode::RANGE_NOT_SATISFIABLE, &h).unwrap();
        assert_eq!(plan, TransferPlan::AlreadyComplete { total: 1000 });
    }

    #[test]
    fn unsatisfiable_range_with_other_total_is_an_error() {
        let h = headers(&[(CONTENT_RANGE, "bytes */900")]);
        let err =
            plan_transfer("http://x", 1000, StatusCode::RANGE_NOT_SATISFIABLE, &h).unwrap_err();
        assert!(matches!(err, InstallError::UnexpectedStatus { .. }));
    }

    #[test]
    fn other_statuses_are_fatal() {
        for status in [
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::NO_CONTENT,
        ] {
            let err = plan_transfer("http://x", 0, status, &HeaderMap::new()).unwrap_err();
            assert!(matches!(err, InstallError::UnexpectedStatus { status: s, .. } if s == status));
        }
    }
}
