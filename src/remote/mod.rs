//! Content API access: the group-by-code and publisher directory fetches.
//!
//! # Architecture
//!
//! - [`ContentSource`] - Async trait the orchestrator depends on
//! - [`HttpContentSource`] - reqwest-backed implementation against the content API
//! - [`RemoteGroupRecord`] - Normalized group record (questions, answers, logo hints)
//! - [`PublisherDirectory`] - Publisher name to logo URL mapping
//!
//! # Example
//!
//! ```no_run
//! use bundler_core::remote::{ContentSource, HttpContentSource};
//! use bundler_core::BundlerConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = HttpContentSource::new(&BundlerConfig::new("https://api.example.com/v1"))?;
//! let group = source.fetch_group("ABC123").await?;
//! println!("{} questions", group.questions.len());
//! # Ok(())
//! # }
//! ```

mod error;
mod record;

pub use error::FetchError;
pub use record::{
    AssetLocator, AvailableLogo, DEFAULT_QUESTION_TYPE, PublisherDirectory, RecordId,
    RemoteAnswer, RemoteGroupRecord, RemoteQuestion,
};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::config::BundlerConfig;
use crate::http_client::build_http_client;

/// Read-only access to the content API.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetches the question group identified by `code`.
    async fn fetch_group(&self, code: &str) -> Result<RemoteGroupRecord, FetchError>;

    /// Fetches the publisher name to logo URL directory.
    async fn fetch_publisher_directory(&self) -> Result<PublisherDirectory, FetchError>;
}

/// [`ContentSource`] backed by the HTTP content API.
///
/// Endpoints are `{api_base}/groups/{code}` and `{api_base}/publishers`.
#[derive(Debug, Clone)]
pub struct HttpContentSource {
    client: Client,
    api_base: Url,
    assets: AssetLocator,
    group_timeout: Duration,
    directory_timeout: Duration,
}

impl HttpContentSource {
    /// Builds a source from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] when the API base is not an absolute
    /// http(s) URL, or [`FetchError::ClientSetup`] when no client can be built.
    pub fn new(config: &BundlerConfig) -> Result<Self, FetchError> {
        let api_base = Url::parse(config.api_base_url.trim())
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| FetchError::invalid_url(config.api_base_url.clone()))?;
        let client = build_http_client("content-api", config.connect_timeout)?;

        Ok(Self {
            client,
            api_base,
            assets: AssetLocator::new(config.effective_asset_base()),
            group_timeout: config.group_timeout,
            directory_timeout: config.directory_timeout,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::invalid_url(self.api_base.as_str()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, url: Url, timeout: Duration) -> Result<Value, FetchError> {
        let url_str = url.to_string();
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&url_str, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url_str, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(&url_str, e))?;
        debug!(url = %url_str, bytes = body.len(), "content API response received");

        serde_json::from_slice(&body)
            .map_err(|e| FetchError::malformed(url_str, format!("invalid JSON: {e}")))
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    #[instrument(skip(self), fields(code = %code))]
    async fn fetch_group(&self, code: &str) -> Result<RemoteGroupRecord, FetchError> {
        let url = self.endpoint(&["groups", code])?;
        let url_str = url.to_string();
        let body = self.get_json(url, self.group_timeout).await?;
        let record = record::decode_group(body, code, &self.assets)
            .map_err(|reason| FetchError::malformed(url_str, reason))?;
        debug!(
            questions = record.questions.len(),
            publisher = ?record.publisher_name,
            "group record decoded"
        );
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn fetch_publisher_directory(&self) -> Result<PublisherDirectory, FetchError> {
        let url = self.endpoint(&["publishers"])?;
        let url_str = url.to_string();
        let body = self.get_json(url, self.directory_timeout).await?;
        let directory = record::decode_publishers(body, &self.assets)
            .map_err(|reason| FetchError::malformed(url_str, reason))?;
        debug!(publishers = directory.len(), "publisher directory decoded");
        Ok(directory)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_appends_segments_after_base_path() {
        let source =
            HttpContentSource::new(&BundlerConfig::new("https://api.example.com/v1/")).unwrap();
        let url = source.endpoint(&["groups", "ABC123"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/groups/ABC123");
    }

    #[test]
    fn test_endpoint_percent_encodes_code() {
        let source = HttpContentSource::new(&BundlerConfig::new("https://api.example.com")).unwrap();
        let url = source.endpoint(&["groups", "A B?"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/groups/A%20B%3F");
    }

    #[test]
    fn test_new_rejects_non_http_base() {
        let result = HttpContentSource::new(&BundlerConfig::new("ftp://api.example.com"));
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));

        let result = HttpContentSource::new(&BundlerConfig::new("not a url"));
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }
}
