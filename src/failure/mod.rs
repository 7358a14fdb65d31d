//! Failure classification and user-facing descriptors for asset download errors.

use serde::Serialize;

use crate::download::DownloadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    NotFound,
    Server,
    Network,
    InvalidSource,
    Storage,
    Interrupted,
}

impl FailureCategory {
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::NotFound => "❌",
            Self::Server => "🛑",
            Self::Network => "🌐",
            Self::InvalidSource => "🔗",
            Self::Storage => "💾",
            Self::Interrupted => "⏹",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::NotFound => "Not found",
            Self::Server => "Server",
            Self::Network => "Network",
            Self::InvalidSource => "Invalid source",
            Self::Storage => "Local storage",
            Self::Interrupted => "Interrupted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureDescriptor {
    pub category: FailureCategory,
    pub what: &'static str,
    pub why: &'static str,
    pub fix: &'static str,
}

/// Returns the category and explanation for a failed asset download.
#[must_use]
pub fn describe_download_error(error: &DownloadError) -> FailureDescriptor {
    match error {
        DownloadError::HttpStatus { status: 404 | 410, .. } => FailureDescriptor {
            category: FailureCategory::NotFound,
            what: "Asset not found",
            why: "The content host no longer serves the file the record points at.",
            fix: "Re-upload the image in the content manager or remove the stale reference.",
        },
        DownloadError::HttpStatus { status, .. } if *status >= 500 => FailureDescriptor {
            category: FailureCategory::Server,
            what: "Content host error",
            why: "The asset host answered with a server error.",
            fix: "Rerun the bundle once the content host is healthy.",
        },
        DownloadError::HttpStatus { .. } => FailureDescriptor {
            category: FailureCategory::InvalidSource,
            what: "Asset request rejected",
            why: "The asset host refused the request for this file.",
            fix: "Check that the asset is publicly readable.",
        },
        DownloadError::EmptyBody { .. } => FailureDescriptor {
            category: FailureCategory::InvalidSource,
            what: "Empty asset",
            why: "The host answered successfully but sent no bytes.",
            fix: "Re-upload the image in the content manager.",
        },
        DownloadError::Timeout { .. } => FailureDescriptor {
            category: FailureCategory::Network,
            what: "Download timed out",
            why: "The asset host did not finish the transfer within the download timeout.",
            fix: "Raise download_timeout_secs or check network stability, then rerun.",
        },
        DownloadError::Network { .. } => FailureDescriptor {
            category: FailureCategory::Network,
            what: "Network request failed",
            why: "Connectivity, DNS, TLS, or proxy conditions interrupted the request.",
            fix: "Check connectivity and proxy settings, then rerun.",
        },
        DownloadError::InvalidUrl { .. } => FailureDescriptor {
            category: FailureCategory::InvalidSource,
            what: "Invalid asset URL",
            why: "The record's image path is not an absolute http(s) URL.",
            fix: "Set asset_base_url so relative image paths can be resolved.",
        },
        DownloadError::Io { .. } => FailureDescriptor {
            category: FailureCategory::Storage,
            what: "Could not write asset",
            why: "The destination file could not be created or written.",
            fix: "Check free space and permissions under the output root.",
        },
        DownloadError::Cancelled { .. } | DownloadError::Aborted { .. } => FailureDescriptor {
            category: FailureCategory::Interrupted,
            what: "Download not completed",
            why: "The run was interrupted before this asset finished.",
            fix: "Rerun the bundle.",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_404_is_not_found() {
        let descriptor = describe_download_error(&DownloadError::http_status("https://x/a", 404));
        assert_eq!(descriptor.category, FailureCategory::NotFound);
        assert_eq!(descriptor.what, "Asset not found");
    }

    #[test]
    fn test_describe_5xx_is_server() {
        let descriptor = describe_download_error(&DownloadError::http_status("https://x/a", 503));
        assert_eq!(descriptor.category, FailureCategory::Server);
    }

    #[test]
    fn test_describe_403_is_invalid_source() {
        let descriptor = describe_download_error(&DownloadError::http_status("https://x/a", 403));
        assert_eq!(descriptor.category, FailureCategory::InvalidSource);
    }

    #[test]
    fn test_describe_timeout_and_io() {
        assert_eq!(
            describe_download_error(&DownloadError::timeout("https://x/a")).category,
            FailureCategory::Network
        );
        let io = DownloadError::io("/x", std::io::Error::other("disk full"));
        assert_eq!(describe_download_error(&io).category, FailureCategory::Storage);
    }

    #[test]
    fn test_describe_cancelled_is_interrupted() {
        let descriptor = describe_download_error(&DownloadError::cancelled("https://x/a"));
        assert_eq!(descriptor.category, FailureCategory::Interrupted);
    }

    #[test]
    fn test_category_labels_and_icons_nonempty() {
        for category in [
            FailureCategory::NotFound,
            FailureCategory::Server,
            FailureCategory::Network,
            FailureCategory::InvalidSource,
            FailureCategory::Storage,
            FailureCategory::Interrupted,
        ] {
            assert!(!category.label().is_empty());
            assert!(!category.icon().is_empty());
        }
    }
}
