//! HTTP transport over `reqwest`, with `file://` support for local mirrors.

use super::Transport;
use crate::constants::{
    DEFAULT_ARCHIVE_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_ATTEMPTS, RETRY_BASE_DELAY_MS, RETRY_MAX_DELAY_MS,
    USER_AGENT,
};
use crate::core::{Result, UpdateError};
use crate::utils::progress::{PercentThrottle, ProgressEvent, ProgressSink};
use reqwest::{Client, Response, StatusCode, Url};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, warn};

/// Timeouts and retry budget for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Timeout for a single file request.
    pub request_timeout: Duration,
    /// Timeout for an archive request.
    pub archive_timeout: Duration,
    /// Total attempts per transfer, including the first one.
    pub retry_attempts: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            archive_timeout: DEFAULT_ARCHIVE_TIMEOUT,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }
}

/// Outcome of one failed attempt, and whether another attempt could help.
#[derive(Debug)]
struct AttemptError {
    reason: String,
    retryable: bool,
}

impl AttemptError {
    fn transient(reason: impl ToString) -> Self {
        Self {
            reason: reason.to_string(),
            retryable: true,
        }
    }

    fn fatal(reason: impl ToString) -> Self {
        Self {
            reason: reason.to_string(),
            retryable: false,
        }
    }

    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_builder() {
            Self::fatal(error)
        } else {
            Self::transient(error)
        }
    }
}

/// Transport used in production.
///
/// `http(s)://` URLs are fetched with per-request timeouts and bounded
/// exponential backoff (200 ms, 400 ms, ... capped at 5 s). Server errors,
/// `429` and network failures are retried; other non-success statuses fail
/// immediately. `file://` URLs are copied.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    options: TransportOptions,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_options(TransportOptions::default())
    }

    pub fn with_options(options: TransportOptions) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build().map_err(|e| UpdateError::Config {
            message: format!("Failed to build HTTP client: {e}"),
        })?;
        Ok(Self {
            client,
            options,
        })
    }

    #[must_use]
    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    fn retry_strategy(&self) -> impl Iterator<Item = Duration> + use<> {
        ExponentialBackoff::from_millis(2)
            .factor(RETRY_BASE_DELAY_MS / 2)
            .max_delay(Duration::from_millis(RETRY_MAX_DELAY_MS))
            .take(self.options.retry_attempts.saturating_sub(1))
    }

    async fn get(&self, url: &str, timeout: Duration) -> std::result::Result<Response, AttemptError> {
        let response =
            self.client.get(url).timeout(timeout).send().await.map_err(AttemptError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let retryable = status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
            if retryable {
                debug!("HTTP {} from {}, will retry", status, url);
            }
            return Err(AttemptError {
                reason: format!("HTTP {status}"),
                retryable,
            });
        }
        Ok(response)
    }

    async fn download_once(&self, url: &str, dest: &Path) -> std::result::Result<(), AttemptError> {
        let response = self.get(url, self.options.request_timeout).await?;
        let bytes = response.bytes().await.map_err(AttemptError::from_reqwest)?;
        tokio::fs::write(dest, &bytes).await.map_err(AttemptError::fatal)?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(())
    }

    async fn download_archive_once(
        &self,
        url: &str,
        dest: &Path,
        progress: &dyn ProgressSink,
    ) -> std::result::Result<(), AttemptError> {
        let mut response = self.get(url, self.options.archive_timeout).await?;
        let total = response.content_length();
        let mut file = tokio::fs::File::create(dest).await.map_err(AttemptError::fatal)?;

        let throttle = PercentThrottle::new();
        let mut received = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(AttemptError::from_reqwest)? {
            file.write_all(&chunk).await.map_err(AttemptError::fatal)?;
            received += chunk.len() as u64;
            if let Some(total) = total {
                if let Some(percent) = throttle.update(received, total) {
                    progress.emit(ProgressEvent::Archive {
                        percent,
                    });
                }
            }
        }
        file.flush().await.map_err(AttemptError::fatal)?;

        if total.is_none() {
            progress.emit(ProgressEvent::Archive {
                percent: 100,
            });
        }
        debug!("Downloaded archive ({} bytes) from {}", received, url);
        Ok(())
    }
}

fn is_file_url(url: &str) -> bool {
    url.get(..7).is_some_and(|scheme| scheme.eq_ignore_ascii_case("file://"))
}

fn transfer_error(url: &str, reason: impl Into<String>) -> UpdateError {
    UpdateError::TransferFailure {
        url: url.to_string(),
        reason: reason.into(),
    }
}

fn file_url_path(url: &str) -> Result<PathBuf> {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.to_file_path().ok())
        .ok_or_else(|| transfer_error(url, "not a valid file URL"))
}

async fn copy_local(url: &str, dest: &Path) -> Result<()> {
    let source = file_url_path(url)?;
    tokio::fs::copy(&source, dest).await.map_err(|e| transfer_error(url, e.to_string()))?;
    Ok(())
}

impl Transport for HttpTransport {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        if is_file_url(url) {
            return copy_local(url, dest).await;
        }

        RetryIf::spawn(
            self.retry_strategy(),
            move || async move { self.download_once(url, dest).await },
            |e: &AttemptError| e.retryable,
        )
        .await
        .map_err(|e| transfer_error(url, e.reason))
    }

    async fn fetch_archive(&self, url: &str, dest: &Path, progress: &dyn ProgressSink) -> Result<()> {
        if is_file_url(url) {
            copy_local(url, dest).await?;
            progress.emit(ProgressEvent::Archive {
                percent: 100,
            });
            return Ok(());
        }

        RetryIf::spawn(
            self.retry_strategy(),
            move || async move { self.download_archive_once(url, dest, progress).await },
            |e: &AttemptError| {
                if e.retryable {
                    warn!("Archive download interrupted ({}), restarting from the beginning", e.reason);
                }
                e.retryable
            },
        )
        .await
        .map_err(|e| transfer_error(url, e.reason))
    }
}
