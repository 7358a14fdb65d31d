//! Download task and result records.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::remote::RecordId;

/// What a downloaded asset is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetRole {
    /// A question's image.
    Question,
    /// An answer's image.
    Answer,
    /// The publisher logo.
    Logo,
}

impl AssetRole {
    /// True for question and answer images, which count toward image totals.
    #[must_use]
    pub fn is_image(self) -> bool {
        matches!(self, Self::Question | Self::Answer)
    }
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Question => "question",
            Self::Answer => "answer",
            Self::Logo => "logo",
        })
    }
}

/// One `(url, destination)` pair to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadTask {
    /// Absolute source URL.
    pub url: String,
    /// Absolute destination path.
    pub dest_path: PathBuf,
    /// What the asset is.
    pub role: AssetRole,
    /// Owning question, for question and answer images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_id: Option<RecordId>,
    /// Answer position within its question, for answer images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_index: Option<usize>,
}

impl DownloadTask {
    /// Task for a question image.
    #[must_use]
    pub fn question_image(
        url: impl Into<String>,
        dest_path: PathBuf,
        question_id: RecordId,
    ) -> Self {
        Self {
            url: url.into(),
            dest_path,
            role: AssetRole::Question,
            question_id: Some(question_id),
            answer_index: None,
        }
    }

    /// Task for an answer image.
    #[must_use]
    pub fn answer_image(
        url: impl Into<String>,
        dest_path: PathBuf,
        question_id: RecordId,
        answer_index: usize,
    ) -> Self {
        Self {
            url: url.into(),
            dest_path,
            role: AssetRole::Answer,
            question_id: Some(question_id),
            answer_index: Some(answer_index),
        }
    }

    /// Task for the publisher logo.
    #[must_use]
    pub fn logo(url: impl Into<String>, dest_path: PathBuf) -> Self {
        Self {
            url: url.into(),
            dest_path,
            role: AssetRole::Logo,
            question_id: None,
            answer_index: None,
        }
    }

    /// Short human label, e.g. `question 12` or `answer 12#3`.
    #[must_use]
    pub fn label(&self) -> String {
        match (&self.question_id, self.answer_index) {
            (Some(id), Some(index)) => format!("{} {id}#{index}", self.role),
            (Some(id), None) => format!("{} {id}", self.role),
            _ => self.role.to_string(),
        }
    }
}

/// Outcome of one task.
#[derive(Debug)]
pub struct TaskResult {
    /// The task as enqueued.
    pub task: DownloadTask,
    /// Bytes written on success, or the failure.
    pub outcome: Result<u64, super::DownloadError>,
}

impl TaskResult {
    /// True when the file was written.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Failure description, if the task failed.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.outcome.as_ref().err().map(ToString::to_string)
    }
}
