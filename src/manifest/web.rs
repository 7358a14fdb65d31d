//! Web-client manifest: `questions/question.json`, `questions/images/*.jpg`,
//! `questions/logo.png`, snake_case keys and string question types.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{ClientProfile, LocalManifest, QuestionAssets, TransformWarning};
use crate::remote::{RecordId, RemoteGroupRecord, RemoteQuestion};

/// Web manifest root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebManifest {
    pub code: String,
    pub name: String,
    pub question_type: String,
    /// Questions in record order.
    pub questions: Vec<WebQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher_name: Option<String>,
    /// Local logo reference, present when the logo download succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// One web question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebQuestion {
    pub id: RecordId,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub answers: Vec<WebAnswer>,
}

/// One web answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebAnswer {
    pub text: String,
    pub is_correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Layout and schema for the web client.
///
/// The whole `questions/` tree belongs to one bundle and is rebuilt on every
/// run.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebProfile;

impl ClientProfile for WebProfile {
    fn asset_root(&self, output_root: &Path) -> PathBuf {
        output_root.join("questions")
    }

    fn manifest_file(&self) -> &'static str {
        "question.json"
    }

    fn image_dir(&self) -> &'static str {
        "images"
    }

    fn logo_file(&self) -> &'static str {
        "logo.png"
    }

    fn image_extension(&self) -> &'static str {
        ".jpg"
    }

    fn rebuilds_asset_root(&self) -> bool {
        true
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
            .map(|(question, assets)| web_question(question, assets, warnings))
            .collect();

        LocalManifest::Web(WebManifest {
            code: record.code.clone(),
            name: record.name.clone(),
            question_type: record.question_type.clone(),
            questions,
            logo_url: None,
            publisher_name: None,
            logo: None,
        })
    }
}

fn web_question(
    question: &RemoteQuestion,
    assets: &QuestionAssets,
    warnings: &mut Vec<TransformWarning>,
) -> WebQuestion {
    if !question.answers.iter().any(|answer| answer.is_correct) {
        warnings.push(TransformWarning::DataQuality {
            question_id: question.id.clone(),
            message: "no answer marked correct".to_string(),
        });
    }

    WebQuestion {
        id: question.id.clone(),
        text: question.text.clone(),
        question_type: question.question_type.clone(),
        category_id: question.category_id.clone(),
        image: assets.image.clone(),
        answers: question
            .answers
            .iter()
            .enumerate()
            .map(|(index, answer)| WebAnswer {
                text: answer.text.clone(),
                is_correct: answer.is_correct,
                image: assets.answers.get(index).cloned().flatten(),
            })
            .collect(),
    }
}
