//! Error types for the download module.
//!
//! Every variant carries the URL or path it concerns so a failure entry in the
//! bundle report can be read on its own.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while downloading one asset.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while creating or writing the destination.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or not http(s).
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The server answered 2xx with no body.
    #[error("empty response body from {url}")]
    EmptyBody {
        /// The URL that returned nothing.
        url: String,
    },

    /// The run was cancelled before this task started.
    #[error("download cancelled before start: {url}")]
    Cancelled {
        /// The URL that was never requested.
        url: String,
    },

    /// The worker running this task died.
    #[error("download task aborted for {url}: {reason}")]
    Aborted {
        /// The URL being downloaded.
        url: String,
        /// Join error description.
        reason: String,
    },
}

impl DownloadError {
    /// Creates a network or timeout error from a reqwest error.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an empty body error.
    pub fn empty_body(url: impl Into<String>) -> Self {
        Self::EmptyBody { url: url.into() }
    }

    /// Creates a cancelled error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Creates an aborted-worker error.
    pub fn aborted(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Aborted {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_http_status_display() {
        let error = DownloadError::http_status("https://cdn.example.com/q1.png", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("q1.png"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_download_error_io_display_includes_path() {
        let error = DownloadError::io(
            "/tmp/out/Images/q1.png",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = error.to_string();
        assert!(msg.contains("/tmp/out/Images/q1.png"), "{msg}");
        assert!(msg.contains("denied"), "{msg}");
    }

    #[test]
    fn test_download_error_empty_body_display() {
        let error = DownloadError::empty_body("https://cdn.example.com/logo.png");
        assert_eq!(
            error.to_string(),
            "empty response body from https://cdn.example.com/logo.png"
        );
    }

    #[test]
    fn test_download_error_source_chain() {
        use std::error::Error;
        let error = DownloadError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(error.source().is_some());
        assert!(DownloadError::timeout("https://x").source().is_none());
    }
}
