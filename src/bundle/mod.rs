//! One bundle run, from group code to a report.
//!
//! The [`BundleOrchestrator`] walks a fixed sequence of steps:
//!
//! 1. validate the request (no network before this passes)
//! 2. fetch the group and the publisher directory concurrently
//! 3. resolve the logo
//! 4. transform the record into the profile's manifest
//! 5. prepare the output tree and write the draft manifest
//! 6. swap a staged tree into place (profiles that rebuild their root)
//! 7. download images and logo
//! 8. rewrite the manifest with logo metadata
//! 9. report
//!
//! Only an invalid request, a failed group fetch, an output error or
//! cancellation ends a run without a report.

mod output;
mod report;

pub use report::{BundleReport, BundleWarning, FailureEntry};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::BundlerConfig;
use crate::download::{AssetDownloader, DownloadObserver, HttpClient};
use crate::logo::{self, ModifiedTimeLookup, NoTimestamps, StorageDirTimestamps};
use crate::manifest::{self, FinalLogo, ManifestError, Profile, Transformed};
use crate::remote::{ContentSource, FetchError, HttpContentSource, PublisherDirectory};
use output::OutputPlan;

/// Pipeline step, used to say where a cancelled run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleStep {
    Fetch,
    Resolve,
    Transform,
    PrepareOutput,
    CommitOutput,
    DownloadAssets,
    FinalizeManifest,
}

impl fmt::Display for BundleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetch => "fetch",
            Self::Resolve => "logo resolution",
            Self::Transform => "transform",
            Self::PrepareOutput => "output preparation",
            Self::CommitOutput => "output commit",
            Self::DownloadAssets => "asset downloads",
            Self::FinalizeManifest => "manifest finalization",
        })
    }
}

/// Errors that end a bundle run without a report.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The request was rejected before any network activity.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// What was wrong.
        reason: String,
    },

    /// The group record could not be fetched or decoded.
    #[error("failed to fetch group '{code}': {source}")]
    FatalFetch {
        /// The requested code.
        code: String,
        /// Underlying fetch failure.
        #[source]
        source: FetchError,
    },

    /// The output tree or a manifest could not be written.
    #[error("output error at {path}: {source}")]
    Output {
        /// Path being written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest could not be serialized.
    #[error(transparent)]
    Manifest(ManifestError),

    /// The caller's cancellation token fired.
    #[error("bundle run cancelled before {step}")]
    Cancelled {
        /// Step that did not run.
        step: BundleStep,
    },

    /// Clients or the downloader could not be constructed.
    #[error("bundler setup failed: {reason}")]
    Setup {
        /// What failed.
        reason: String,
    },
}

impl BundleError {
    /// Creates an invalid request error.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Creates an output error.
    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }

    fn setup(reason: impl fmt::Display) -> Self {
        Self::Setup {
            reason: reason.to_string(),
        }
    }
}

/// What to bundle and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRequest {
    /// Group code.
    pub code: String,
    /// Target client.
    pub profile: Profile,
    /// Root directory the profile's layout is created under.
    pub output_root: PathBuf,
}

impl BundleRequest {
    /// Creates a request.
    pub fn new(code: impl Into<String>, profile: Profile, output_root: impl Into<PathBuf>) -> Self {
        Self {
            code: code.into(),
            profile,
            output_root: output_root.into(),
        }
    }

    /// Checks the request without touching the network or disk.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::InvalidRequest`] when the code is blank or cannot
    /// be used as one URL path segment, or the output root is empty.
    pub fn validate(&self) -> Result<(), BundleError> {
        let code = self.code.trim();
        if code.is_empty() {
            return Err(BundleError::invalid_request("group code must not be empty"));
        }
        if code == "." || code == ".." {
            return Err(BundleError::invalid_request(format!(
                "group code '{code}' is not a valid path segment"
            )));
        }
        if code
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
        {
            return Err(BundleError::invalid_request(format!(
                "group code '{}' must not contain slashes or control characters",
                code.escape_debug()
            )));
        }
        if self.output_root.as_os_str().is_empty() {
            return Err(BundleError::invalid_request("output root must not be empty"));
        }
        Ok(())
    }
}

/// Runs bundle requests against a content source.
#[derive(Clone)]
pub struct BundleOrchestrator {
    source: Arc<dyn ContentSource>,
    downloader: AssetDownloader,
    timestamps: Arc<dyn ModifiedTimeLookup>,
}

impl fmt::Debug for BundleOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleOrchestrator")
            .field("downloader", &self.downloader)
            .finish_non_exhaustive()
    }
}

impl BundleOrchestrator {
    /// Creates an orchestrator with no logo timestamp source.
    #[must_use]
    pub fn new(source: Arc<dyn ContentSource>, downloader: AssetDownloader) -> Self {
        Self {
            source,
            downloader,
            timestamps: Arc::new(NoTimestamps),
        }
    }

    /// Sets where logo modification times come from.
    #[must_use]
    pub fn with_timestamps(mut self, timestamps: Arc<dyn ModifiedTimeLookup>) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Builds the HTTP source, downloader and timestamp lookup from config.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::Setup`] when the API base URL is invalid, a
    /// client cannot be built, or the concurrency is out of range.
    pub fn from_config(
        config: &BundlerConfig,
        observer: Option<Arc<dyn DownloadObserver>>,
    ) -> Result<Self, BundleError> {
        let source = HttpContentSource::new(config).map_err(BundleError::setup)?;
        let client = HttpClient::with_timeouts(config.connect_timeout, config.download_timeout)
            .map_err(BundleError::setup)?;
        let mut downloader =
            AssetDownloader::new(client, config.concurrency).map_err(BundleError::setup)?;
        if let Some(observer) = observer {
            downloader = downloader.with_observer(observer);
        }

        let mut orchestrator = Self::new(Arc::new(source), downloader);
        if let Some(dir) = &config.logo_storage_dir {
            orchestrator =
                orchestrator.with_timestamps(Arc::new(StorageDirTimestamps::new(dir.clone())));
        }
        Ok(orchestrator)
    }

    /// Runs one bundle.
    ///
    /// # Errors
    ///
    /// - [`BundleError::InvalidRequest`] before any network activity
    /// - [`BundleError::FatalFetch`] when the group fetch fails; nothing is written
    /// - [`BundleError::Output`] / [`BundleError::Manifest`] when the output
    ///   tree or a manifest cannot be written
    /// - [`BundleError::Cancelled`] when `cancel` fires
    ///
    /// Individual download failures are not errors; they are listed in the
    /// report.
    #[instrument(skip(self, request, cancel), fields(code = %request.code.trim(), profile = %request.profile))]
    pub async fn run(
        &self,
        request: &BundleRequest,
        cancel: &CancellationToken,
    ) -> Result<BundleReport, BundleError> {
        let started = Instant::now();
        request.validate()?;
        let code = request.code.trim();
        let strategy = request.profile.strategy();

        ensure_active(cancel, BundleStep::Fetch)?;
        info!("fetching group and publisher directory");
        let (record, directory) = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(BundleError::Cancelled { step: BundleStep::Fetch });
            }
            // A failed group fetch ends the run without waiting on the directory.
            pair = async {
                tokio::try_join!(
                    async {
                        self.source.fetch_group(code).await.map_err(|source| {
                            BundleError::FatalFetch {
                                code: code.to_string(),
                                source,
                            }
                        })
                    },
                    async { Ok::<_, BundleError>(self.source.fetch_publisher_directory().await) }
                )
            } => pair?,
        };

        let mut warnings = Vec::new();
        let directory = directory.unwrap_or_else(|error| {
            warn!(error = %error, "publisher directory unavailable; continuing without it");
            warnings.push(BundleWarning::DirectoryFetch {
                reason: error.to_string(),
            });
            PublisherDirectory::new()
        });
        info!(
            questions = record.questions.len(),
            publishers = directory.len(),
            "group fetched"
        );

        ensure_active(cancel, BundleStep::Resolve)?;
        let resolved_logo = logo::resolve(&record, &directory, self.timestamps.as_ref());
        match resolved_logo.url.as_deref() {
            None => {
                warn!("no publisher logo found");
                warnings.push(BundleWarning::Resolution);
            }
            Some(url) if resolved_logo.is_substitute() => {
                warn!(url, "using group image as logo");
                warnings.push(BundleWarning::LogoSubstitute {
                    url: url.to_string(),
                });
            }
            Some(url) => info!(url, tier = ?resolved_logo.tier, "logo resolved"),
        }

        ensure_active(cancel, BundleStep::Transform)?;
        let Transformed {
            mut manifest,
            tasks,
            warnings: transform_warnings,
        } = manifest::transform(&record, &resolved_logo, request.profile, &request.output_root);
        for warning in transform_warnings.into_iter().map(BundleWarning::from) {
            warn!(%warning, "data quality");
            warnings.push(warning);
        }

        ensure_active(cancel, BundleStep::PrepareOutput)?;
        let plan = OutputPlan::new(strategy, &request.output_root);
        create_output_root(&request.output_root).await?;
        output::prepare(&plan, strategy).await?;

        let draft = manifest.to_json_bytes().map_err(BundleError::Manifest)?;
        if let Err(error) = output::write_atomic(&plan.draft_manifest_path(), &draft).await {
            output::discard(&plan).await;
            return Err(error);
        }
        info!(path = %plan.draft_manifest_path().display(), "draft manifest written");

        if cancel.is_cancelled() {
            output::discard(&plan).await;
            return Err(BundleError::Cancelled {
                step: BundleStep::CommitOutput,
            });
        }
        match output::commit(&plan).await {
            Ok(commit_warnings) => warnings.extend(commit_warnings),
            Err(error) => {
                output::discard(&plan).await;
                return Err(error);
            }
        }

        ensure_active(cancel, BundleStep::DownloadAssets)?;
        let results = self.downloader.download_all(tasks, cancel).await;
        ensure_active(cancel, BundleStep::FinalizeManifest)?;
        let tally = report::tally(results);

        manifest.finalize(FinalLogo {
            logo_url: resolved_logo.url.clone(),
            publisher_name: record.publisher_name.clone(),
            local_reference: tally
                .logo_succeeded
                .then(|| strategy.logo_file().to_string()),
        });
        let final_bytes = manifest.to_json_bytes().map_err(BundleError::Manifest)?;
        let manifest_path = plan.manifest_path();
        output::write_atomic(&manifest_path, &final_bytes).await?;

        let report = BundleReport {
            code: code.to_string(),
            profile: request.profile,
            question_count: manifest.question_count(),
            images_attempted: tally.images_attempted,
            images_succeeded: tally.images_succeeded,
            logo_attempted: tally.logo_attempted,
            logo_succeeded: tally.logo_succeeded,
            logo_url: resolved_logo.url,
            logo_tier: resolved_logo.tier,
            logo_detail: resolved_logo.detail,
            manifest_path,
            failures: tally.failures,
            warnings,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        info!(
            questions = report.question_count,
            images_attempted = report.images_attempted,
            images_succeeded = report.images_succeeded,
            logo_succeeded = report.logo_succeeded,
            warnings = report.warnings.len(),
            elapsed_ms = report.elapsed_ms,
            "bundle complete"
        );
        Ok(report)
    }
}

fn ensure_active(cancel: &CancellationToken, step: BundleStep) -> Result<(), BundleError> {
    if cancel.is_cancelled() {
        debug!(%step, "cancellation observed");
        return Err(BundleError::Cancelled { step });
    }
    Ok(())
}

async fn create_output_root(output_root: &Path) -> Result<(), BundleError> {
    tokio::fs::create_dir_all(output_root)
        .await
        .map_err(|e| BundleError::output(output_root, e))
}
