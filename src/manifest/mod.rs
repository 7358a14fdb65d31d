//! Mapping a remote group record into a client-specific local manifest.
//!
//! Two client runtimes consume bundles. They differ only in directory layout,
//! key naming and how question types and correctness are encoded, so each is a
//! [`ClientProfile`] implementation and the shared [`transform`] drives both.
//!
//! # Architecture
//!
//! - [`Profile`] - Which client a bundle targets (`engine` or `web`)
//! - [`ClientProfile`] - Layout + schema strategy, implemented by
//!   [`EngineProfile`] and [`WebProfile`]
//! - [`transform`] - Record + resolved logo → manifest, download tasks, warnings
//! - [`LocalManifest`] - Draft manifest, finalized with logo metadata after downloads

mod engine;
mod filename;
mod web;

pub use engine::{EngineAnswer, EngineManifest, EngineProfile, EngineQuestion, engine_type_code};
pub use filename::fold_to_ascii;
pub use web::{WebAnswer, WebManifest, WebProfile, WebQuestion};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::download::DownloadTask;
use crate::logo::ResolvedLogo;
use crate::remote::{RecordId, RemoteGroupRecord};
use filename::{FileNamer, answer_prefix, question_prefix};

/// Target client runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Game-engine client.
    EngineClient,
    /// Browser client.
    WebClient,
}

impl Profile {
    /// Returns the layout/schema strategy for this profile.
    #[must_use]
    pub fn strategy(self) -> &'static dyn ClientProfile {
        match self {
            Self::EngineClient => &EngineProfile,
            Self::WebClient => &WebProfile,
        }
    }

    /// Short name used on the command line and in default paths.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EngineClient => "engine",
            Self::WebClient => "web",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "engine" | "engine_client" | "engine-client" => Ok(Self::EngineClient),
            "web" | "web_client" | "web-client" => Ok(Self::WebClient),
            other => Err(format!("unknown profile '{other}' (expected engine or web)")),
        }
    }
}

/// Local image references for one question, aligned with its answers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionAssets {
    /// Question image reference.
    pub image: Option<String>,
    /// One entry per answer, `None` for answers without an image.
    pub answers: Vec<Option<String>>,
}

/// Directory layout and manifest schema of one client runtime.
///
/// Paths returned by `manifest_file`, `image_dir` and `logo_file` are relative
/// to the asset root; manifest image references are relative to it as well.
pub trait ClientProfile: fmt::Debug + Send + Sync {
    /// Directory under `output_root` that this profile writes into.
    fn asset_root(&self, output_root: &Path) -> PathBuf;

    /// Manifest location relative to the asset root.
    fn manifest_file(&self) -> &'static str;

    /// Image directory relative to the asset root.
    fn image_dir(&self) -> &'static str;

    /// Logo location relative to the asset root.
    fn logo_file(&self) -> &'static str;

    /// Extension given to downloaded images, dot included.
    fn image_extension(&self) -> &'static str;

    /// True when the asset root is owned by the bundle and replaced on every
    /// run; false when it is shared with other content and only overwritten.
    fn rebuilds_asset_root(&self) -> bool;

    /// Builds the draft manifest.
    fn build_manifest(
        &self,
        record: &RemoteGroupRecord,
        assets: &[QuestionAssets],
        warnings: &mut Vec<TransformWarning>,
    ) -> LocalManifest;
}

/// Data problems found while transforming; defaults were applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformWarning {
    /// A value was missing or contradictory.
    DataQuality {
        question_id: RecordId,
        message: String,
    },
    /// The question type has no engine code; 0 was used.
    UnknownQuestionType { question_id: RecordId, value: String },
}

/// Errors producing manifest bytes.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// JSON serialization failed.
    #[error("failed to encode manifest: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}

/// Logo metadata added by the final manifest write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalLogo {
    /// Resolved logo URL.
    pub logo_url: Option<String>,
    /// Publisher display name.
    pub publisher_name: Option<String>,
    /// Local logo reference, only when the logo download succeeded.
    pub local_reference: Option<String>,
}

/// A profile-specific manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalManifest {
    /// Engine-client schema.
    Engine(EngineManifest),
    /// Web-client schema.
    Web(WebManifest),
}

impl LocalManifest {
    /// Number of questions.
    #[must_use]
    pub fn question_count(&self) -> usize {
        match self {
            Self::Engine(manifest) => manifest.questions.len(),
            Self::Web(manifest) => manifest.questions.len(),
        }
    }

    /// Sets logo and publisher fields for the final write.
    pub fn finalize(&mut self, logo: FinalLogo) {
        match self {
            Self::Engine(manifest) => {
                manifest.logo_url = logo.logo_url;
                manifest.publisher_name = logo.publisher_name;
                manifest.logo_path = logo.local_reference;
            }
            Self::Web(manifest) => {
                manifest.logo_url = logo.logo_url;
                manifest.publisher_name = logo.publisher_name;
                manifest.logo = logo.local_reference;
            }
        }
    }

    /// Pretty-printed JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Encode`] if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ManifestError> {
        let encoded = match self {
            Self::Engine(manifest) => serde_json::to_vec_pretty(manifest),
            Self::Web(manifest) => serde_json::to_vec_pretty(manifest),
        };
        let mut bytes = encoded.map_err(|source| ManifestError::Encode { source })?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Output of [`transform`].
#[derive(Debug, Clone)]
pub struct Transformed {
    /// Draft manifest (no logo metadata yet).
    pub manifest: LocalManifest,
    /// Image tasks in question order, then the logo task if a logo resolved.
    pub tasks: Vec<DownloadTask>,
    /// Data problems found.
    pub warnings: Vec<TransformWarning>,
}

/// Maps `record` into `profile`'s manifest and the downloads it references.
///
/// Download destinations are absolute paths under the profile's asset root in
/// `output_root`. Image filenames are unique within the run and depend only on
/// the record, so repeated runs produce identical names.
#[must_use]
pub fn transform(
    record: &RemoteGroupRecord,
    logo: &ResolvedLogo,
    profile: Profile,
    output_root: &Path,
) -> Transformed {
    let strategy = profile.strategy();
    let asset_root = strategy.asset_root(output_root);
    let image_dir = asset_root.join(strategy.image_dir());
    let extension = strategy.image_extension();

    let mut namer = FileNamer::new();
    let mut tasks = Vec::new();
    let mut assets = Vec::with_capacity(record.questions.len());

    for question in &record.questions {
        let mut entry = QuestionAssets::default();

        if let Some(url) = question.image_url.as_deref() {
            let file = namer.claim(&question_prefix(&question.id), url, extension);
            tasks.push(DownloadTask::question_image(
                url,
                image_dir.join(&file),
                question.id.clone(),
            ));
            entry.image = Some(image_reference(strategy, &file));
        }

        for (index, answer) in question.answers.iter().enumerate() {
            let reference = answer.image_url.as_deref().map(|url| {
                let file = namer.claim(&answer_prefix(&question.id, index), url, extension);
                tasks.push(DownloadTask::answer_image(
                    url,
                    image_dir.join(&file),
                    question.id.clone(),
                    index,
                ));
                image_reference(strategy, &file)
            });
            entry.answers.push(reference);
        }

        assets.push(entry);
    }

    if let Some(url) = logo.url.as_deref() {
        tasks.push(DownloadTask::logo(url, asset_root.join(strategy.logo_file())));
    }

    let mut warnings = Vec::new();
    let manifest = strategy.build_manifest(record, &assets, &mut warnings);

    debug!(
        profile = %profile,
        questions = manifest.question_count(),
        tasks = tasks.len(),
        warnings = warnings.len(),
        "record transformed"
    );

    Transformed {
        manifest,
        tasks,
        warnings,
    }
}

/// Manifest reference for a downloaded image.
fn image_reference(strategy: &dyn ClientProfile, file: &str) -> String {
    format!("{}/{file}", strategy.image_dir())
}
