//! Quiz Bundler Core Library
//!
//! Fetches a quiz question group by its share code, works out which publisher
//! logo belongs to it, rewrites it into the manifest schema of a target game
//! client and downloads every referenced image, producing a self-contained
//! local asset tree plus a run report.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`remote`] - Content API access (group record, publisher directory)
//! - [`logo`] - Tiered publisher logo resolution
//! - [`manifest`] - Client profiles, manifest schemas and the record transform
//! - [`download`] - Bounded-concurrency streaming asset downloads
//! - [`bundle`] - Orchestration, output tree handling and run reports
//! - [`failure`] - Download failure categories for summaries
//! - [`config`] - Library configuration and defaults

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bundle;
pub mod config;
pub mod download;
pub mod failure;
pub(crate) mod http_client;
pub mod logo;
pub mod manifest;
pub mod remote;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use bundle::{
    BundleError, BundleOrchestrator, BundleReport, BundleRequest, BundleStep, BundleWarning,
    FailureEntry,
};
pub use config::BundlerConfig;
pub use download::{
    AssetDownloader, AssetRole, DEFAULT_CONCURRENCY, DownloadError, DownloadObserver,
    DownloadTask, EngineError, HttpClient, TaskResult,
};
pub use failure::{FailureCategory, FailureDescriptor, describe_download_error};
pub use http_client::ClientBuildError;
pub use logo::{HeuristicDetail, LogoTier, ModifiedTimeLookup, ResolvedLogo};
pub use manifest::{LocalManifest, ManifestError, Profile, TransformWarning, transform};
pub use remote::{
    ContentSource, FetchError, HttpContentSource, PublisherDirectory, RecordId, RemoteGroupRecord,
};
