//! Error types for content API fetches.

use thiserror::Error;

use crate::http_client::ClientBuildError;

/// Errors that can occur while fetching records from the content API.
///
/// A `FetchError` from the group fetch aborts the bundle; the same error from
/// the publisher directory fetch is downgraded to a warning by the caller.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request did not complete within its timeout.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Network-level failure (DNS, connection refused, TLS).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL being fetched.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-2xx status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL being fetched.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The body was not JSON or did not have the expected shape.
    #[error("malformed response from {url}: {reason}")]
    Malformed {
        /// The URL being fetched.
        url: String,
        /// What was wrong with the body.
        reason: String,
    },

    /// The endpoint URL could not be built from the configured base.
    #[error("invalid endpoint URL: {url}")]
    InvalidUrl {
        /// The offending URL or base.
        url: String,
    },

    /// No HTTP client could be built for the content API.
    #[error(transparent)]
    ClientSetup(#[from] ClientBuildError),
}

impl FetchError {
    /// Maps a reqwest error, distinguishing timeouts from other network failures.
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

    /// Creates a malformed-body error.
    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_http_status_display() {
        let error = FetchError::http_status("https://api.example.com/groups/X1", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("/groups/X1"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_fetch_error_malformed_display_carries_reason() {
        let error = FetchError::malformed(
            "https://api.example.com/groups/X1",
            "missing field `questions`",
        );
        let msg = error.to_string();
        assert!(msg.starts_with("malformed response"), "{msg}");
        assert!(msg.contains("missing field `questions`"), "{msg}");
    }

    #[test]
    fn test_fetch_error_timeout_display() {
        let error = FetchError::Timeout {
            url: "https://api.example.com/publishers".to_string(),
        };
        assert!(error.to_string().contains("timeout"));
    }
}
