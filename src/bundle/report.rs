//! Run report returned on every non-fatal path.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::download::{DownloadTask, TaskResult};
use crate::failure::{FailureCategory, describe_download_error};
use crate::logo::{HeuristicDetail, LogoTier};
use crate::manifest::{Profile, TransformWarning};
use crate::remote::RecordId;

/// A recovered condition worth surfacing to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BundleWarning {
    /// The publisher directory could not be fetched; an empty one was used.
    DirectoryFetch { reason: String },
    /// No logo was found at any tier.
    Resolution,
    /// The group image stands in for the logo.
    LogoSubstitute { url: String },
    /// A default was applied for missing or contradictory data.
    DataQuality {
        question_id: RecordId,
        message: String,
    },
    /// The question type has no engine code.
    UnknownQuestionType { question_id: RecordId, value: String },
    /// The previous output could not be removed after the swap.
    StaleOutputCleanup { path: PathBuf, reason: String },
}

impl From<TransformWarning> for BundleWarning {
    fn from(warning: TransformWarning) -> Self {
        match warning {
            TransformWarning::DataQuality {
                question_id,
                message,
            } => Self::DataQuality {
                question_id,
                message,
            },
            TransformWarning::UnknownQuestionType { question_id, value } => {
                Self::UnknownQuestionType { question_id, value }
            }
        }
    }
}

impl fmt::Display for BundleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryFetch { reason } => {
                write!(f, "publisher directory unavailable: {reason}")
            }
            Self::Resolution => f.write_str("no publisher logo found"),
            Self::LogoSubstitute { url } => write!(f, "group image used as logo: {url}"),
            Self::DataQuality {
                question_id,
                message,
            } => write!(f, "question {question_id}: {message}"),
            Self::UnknownQuestionType { question_id, value } => {
                write!(f, "question {question_id}: unknown question type '{value}'")
            }
            Self::StaleOutputCleanup { path, reason } => {
                write!(f, "could not remove {}: {reason}", path.display())
            }
        }
    }
}

/// One failed download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    /// The task that failed.
    pub task: DownloadTask,
    /// Error text.
    pub reason: String,
    /// Failure category for grouping.
    pub category: FailureCategory,
}

/// Summary of one bundle run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleReport {
    pub code: String,
    pub profile: Profile,
    pub question_count: usize,
    /// Question and answer image downloads attempted.
    pub images_attempted: usize,
    pub images_succeeded: usize,
    pub logo_attempted: bool,
    pub logo_succeeded: bool,
    pub logo_url: Option<String>,
    pub logo_tier: LogoTier,
    pub logo_detail: Option<HeuristicDetail>,
    /// Final manifest location.
    pub manifest_path: PathBuf,
    pub failures: Vec<FailureEntry>,
    pub warnings: Vec<BundleWarning>,
    /// Wall time of the run.
    pub elapsed_ms: u64,
}

impl BundleReport {
    /// Number of failed image downloads.
    #[must_use]
    pub fn images_failed(&self) -> usize {
        self.images_attempted - self.images_succeeded
    }

    /// Pretty JSON for printing.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; the report contains only plain data so
    /// this does not happen in practice.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Download counts folded from task results.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Tally {
    pub images_attempted: usize,
    pub images_succeeded: usize,
    pub logo_attempted: bool,
    pub logo_succeeded: bool,
    pub failures: Vec<FailureEntry>,
}

pub(crate) fn tally(results: Vec<TaskResult>) -> Tally {
    let mut tally = Tally::default();
    for result in results {
        let ok = result.ok();
        if result.task.role.is_image() {
            tally.images_attempted += 1;
            if ok {
                tally.images_succeeded += 1;
            }
        } else {
            tally.logo_attempted = true;
            tally.logo_succeeded |= ok;
        }
        if let Err(error) = &result.outcome {
            tally.failures.push(FailureEntry {
                category: describe_download_error(error).category,
                reason: error.to_string(),
                task: result.task,
            });
        }
    }
    tally
}
