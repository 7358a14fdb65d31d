//! HTTP client wrapper for downloading assets.
//!
//! This module provides the `HttpClient` struct which streams one response body
//! to a fixed destination path with a whole-request timeout.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::error::DownloadError;
use crate::config::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_DOWNLOAD_TIMEOUT};
use crate::http_client::{ClientBuildError, build_http_client};

/// HTTP client for downloading assets with streaming support.
///
/// Created once per run and shared by all download workers, taking advantage
/// of connection pooling.
///
/// # Example
///
/// ```no_run
/// use bundler_core::download::HttpClient;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let bytes = client
///     .download_to_path("https://cdn.example.com/q1.png", Path::new("./out/Images/q1.png"))
///     .await?;
/// println!("wrote {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    request_timeout: Duration,
}

impl HttpClient {
    /// Creates a client with the default connect and download timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when no client can be built.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_DOWNLOAD_TIMEOUT)
    }

    /// Creates a client with explicit timeouts.
    ///
    /// `request_timeout` bounds one whole transfer, body included.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when no client can be built.
    #[instrument(level = "debug")]
    pub fn with_timeouts(
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ClientBuildError> {
        let client = build_http_client("asset-download", connect_timeout)?;
        Ok(Self {
            client,
            request_timeout,
        })
    }

    /// Returns the per-transfer timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Downloads `url` to `dest_path`, creating parent directories.
    ///
    /// Returns the number of bytes written. On any failure after the file was
    /// created the partial file is removed. A 2xx response with an empty body
    /// counts as a failure.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] for invalid URLs, network failures, timeouts,
    /// non-2xx statuses, empty bodies and file system errors.
    #[instrument(skip(self), fields(dest = %dest_path.display()))]
    pub async fn download_to_path(
        &self,
        url: &str,
        dest_path: &Path,
    ) -> Result<u64, DownloadError> {
        let parsed = Url::parse(url)
            .ok()
            .filter(|parsed| matches!(parsed.scheme(), "http" | "https"))
            .ok_or_else(|| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .get(parsed)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        if let Some(parent) = dest_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }

        let mut file = File::create(dest_path)
            .await
            .map_err(|e| DownloadError::io(dest_path, e))?;

        // Stream response body to file, with cleanup on error
        let stream_result = stream_to_file(&mut file, response, url, dest_path).await;
        drop(file);

        match stream_result {
            Ok(0) => {
                debug!("empty body; removing destination");
                let _ = tokio::fs::remove_file(dest_path).await;
                Err(DownloadError::empty_body(url))
            }
            Ok(bytes) => {
                debug!(bytes, "asset written");
                Ok(bytes)
            }
            Err(error) => {
                debug!(error = %error, "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(dest_path).await;
                Err(error)
            }
        }
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::from_reqwest(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}
