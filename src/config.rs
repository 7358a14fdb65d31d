//! Validated runtime configuration handed to the bundling pipeline.
//!
//! The CLI merges command-line flags, the config file and these defaults into a
//! single [`BundlerConfig`]; the library never reads files or environment
//! variables itself.

use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for the group-by-code fetch.
pub const DEFAULT_GROUP_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for the publisher directory fetch.
pub const DEFAULT_DIRECTORY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for one asset download (whole transfer).
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Default TCP/TLS connect timeout shared by all clients.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for one bundler instance.
#[derive(Debug, Clone)]
pub struct BundlerConfig {
    /// Base URL of the content API (`{base}/groups/{code}`, `{base}/publishers`).
    pub api_base_url: String,
    /// Base URL that relative asset paths in API responses are joined onto.
    /// Falls back to `api_base_url` when unset.
    pub asset_base_url: Option<String>,
    /// Local directory mirroring the publisher logo storage; enables the
    /// most-recently-modified logo heuristic.
    pub logo_storage_dir: Option<PathBuf>,
    /// Maximum concurrent asset transfers.
    pub concurrency: usize,
    /// Timeout for the group fetch.
    pub group_timeout: Duration,
    /// Timeout for the publisher directory fetch.
    pub directory_timeout: Duration,
    /// Timeout for each asset download.
    pub download_timeout: Duration,
    /// Connect timeout shared by all clients.
    pub connect_timeout: Duration,
}

impl BundlerConfig {
    /// Creates a config for the given API base with every other value defaulted.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            asset_base_url: None,
            logo_storage_dir: None,
            concurrency: crate::download::DEFAULT_CONCURRENCY,
            group_timeout: DEFAULT_GROUP_TIMEOUT,
            directory_timeout: DEFAULT_DIRECTORY_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Returns the base URL used for relative asset paths.
    #[must_use]
    pub fn effective_asset_base(&self) -> &str {
        self.asset_base_url
            .as_deref()
            .unwrap_or(self.api_base_url.as_str())
    }
}
