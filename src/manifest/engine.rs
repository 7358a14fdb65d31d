//! Engine-client manifest: `Questions/QuestionsData.json`, `Images/*.png`,
//! `Logo/logo.png`, camelCase keys and integer question types.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{ClientProfile, LocalManifest, QuestionAssets, TransformWarning};
use crate::remote::{RecordId, RemoteGroupRecord, RemoteQuestion};

/// Engine manifest root. An object rather than a bare array so the engine's
/// JSON utilities can deserialize it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineManifest {
    /// Questions in record order.
    pub questions: Vec<EngineQuestion>,
    /// Resolved logo URL (final write only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    /// Publisher display name (final write only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher_name: Option<String>,
    /// Local logo reference, present when the logo download succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<String>,
}

/// One engine question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineQuestion {
    pub id: RecordId,
    pub question_text: String,
    /// 0 multiple choice, 1 true/false, 2 open answer.
    pub question_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_image: Option<String>,
    pub answers: Vec<EngineAnswer>,
    /// Index of the first correct answer.
    pub correct_answer_id: usize,
}

/// One engine answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineAnswer {
    pub answer_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_image: Option<String>,
}

/// Maps a question type string to the engine's integer code.
#[must_use]
pub fn engine_type_code(value: &str) -> Option<u8> {
    match value.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
        "multiple_choice" => Some(0),
        "true_false" => Some(1),
        "qa" => Some(2),
        _ => None,
    }
}

/// Layout and schema for the engine client.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineProfile;

impl ClientProfile for EngineProfile {
    fn asset_root(&self, output_root: &Path) -> PathBuf {
        output_root.to_path_buf()
    }

    fn manifest_file(&self) -> &'static str {
        "Questions/QuestionsData.json"
    }

    fn image_dir(&self) -> &'static str {
        "Images"
    }

    fn logo_file(&self) -> &'static str {
        "Logo/logo.png"
    }

    fn image_extension(&self) -> &'static str {
        ".png"
    }

    fn rebuilds_asset_root(&self) -> bool {
        false
    }

    fn build_manifest(
        &self,
        record: &RemoteGroupRecord,
        assets: &[QuestionAssets],
        warnings: &mut Vec<TransformWarning>,
    ) -> LocalManifest {
        let questions = record
            .questions
            .iter()
            .zip(assets)
            .map(|(question, assets)| engine_question(question, assets, warnings))
            .collect();

        LocalManifest::Engine(EngineManifest {
            questions,
            logo_url: None,
            publisher_name: None,
            logo_path: None,
        })
    }
}

fn engine_question(
    question: &RemoteQuestion,
    assets: &QuestionAssets,
    warnings: &mut Vec<TransformWarning>,
) -> EngineQuestion {
    let question_type = engine_type_code(&question.question_type).unwrap_or_else(|| {
        warnings.push(TransformWarning::UnknownQuestionType {
            question_id: question.id.clone(),
            value: question.question_type.clone(),
        });
        0
    });

    let correct: Vec<usize> = question
        .answers
        .iter()
        .enumerate()
        .filter(|(_, answer)| answer.is_correct)
        .map(|(index, _)| index)
        .collect();
    let correct_answer_id = match correct.as_slice() {
        [] => {
            warnings.push(TransformWarning::DataQuality {
                question_id: question.id.clone(),
                message: "no answer marked correct; correctAnswerId defaults to 0".to_string(),
            });
            0
        }
        [first, rest @ ..] => {
            if !rest.is_empty() {
                warnings.push(TransformWarning::DataQuality {
                    question_id: question.id.clone(),
                    message: format!(
                        "{} answers marked correct; using the first (index {first})",
                        correct.len()
                    ),
                });
            }
            *first
        }
    };

    let answers = question
        .answers
        .iter()
        .enumerate()
        .map(|(index, answer)| EngineAnswer {
            answer_text: answer.text.clone(),
            answer_image: assets.answers.get(index).cloned().flatten(),
        })
        .collect();

    EngineQuestion {
        id: question.id.clone(),
        question_text: question.text.clone(),
        question_type,
        category_id: question.category_id.clone(),
        question_image: assets.image.clone(),
        answers,
        correct_answer_id,
    }
}
