//! Remote record shapes and their normalization.
//!
//! The content API has renamed fields across revisions (`question_text` vs
//! `text`, `image_path` vs `image_url` vs `question_image`) and encodes some
//! scalars loosely. Every variant is accepted here, once, and folded into the
//! single internal shape the rest of the crate works with.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Question type assumed when neither the question nor its group names one.
pub const DEFAULT_QUESTION_TYPE: &str = "multiple_choice";

/// Identifier as returned by the API: numeric or string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Integer primary key.
    Number(i64),
    /// String identifier (UUIDs, slugs, stringified integers).
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A question group as fetched from the content API, normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteGroupRecord {
    /// Group identifier.
    pub id: RecordId,
    /// Public short code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Group-level question type string.
    pub question_type: String,
    /// Publisher display name, when the group has one.
    pub publisher_name: Option<String>,
    /// Logo URL stored on the group itself.
    pub logo_url: Option<String>,
    /// The group's own illustrative image (absolute URL).
    pub image_path: Option<String>,
    /// Logos uploaded to storage that may belong to this publisher.
    pub available_logos: Vec<AvailableLogo>,
    /// Questions in authoring order.
    pub questions: Vec<RemoteQuestion>,
}

/// One question of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteQuestion {
    /// Question identifier.
    pub id: RecordId,
    /// Question text.
    pub text: String,
    /// Question type string (inherited from the group when absent).
    pub question_type: String,
    /// Optional category identifier.
    pub category_id: Option<RecordId>,
    /// Absolute URL of the question image.
    pub image_url: Option<String>,
    /// Answers in authoring order.
    pub answers: Vec<RemoteAnswer>,
}

/// One answer of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAnswer {
    /// Answer text.
    pub text: String,
    /// Whether this answer is marked correct.
    pub is_correct: bool,
    /// Absolute URL of the answer image.
    pub image_url: Option<String>,
}

/// A logo file present in publisher logo storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableLogo {
    /// Storage path as returned by the API (used for matching and mtime lookup).
    pub path: String,
    /// Absolute download URL.
    pub url: String,
}

impl AvailableLogo {
    /// Returns the file name component of the storage path.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }
}

/// Mapping from publisher name to logo URL.
///
/// Keys are case-sensitive exactly as the API returns them. When the API lists
/// the same name twice, the first entry wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublisherDirectory {
    logos: HashMap<String, String>,
}

impl PublisherDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry; returns false when the name was already present.
    pub fn insert(&mut self, name: impl Into<String>, logo_url: impl Into<String>) -> bool {
        let name = name.into();
        if self.logos.contains_key(&name) {
            debug!(publisher = %name, "duplicate publisher in directory; keeping first entry");
            return false;
        }
        self.logos.insert(name, logo_url.into());
        true
    }

    /// Looks up a publisher's logo URL by exact name.
    #[must_use]
    pub fn logo_for(&self, name: &str) -> Option<&str> {
        self.logos.get(name).map(String::as_str)
    }

    /// Number of publishers in the directory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.logos.len()
    }

    /// True when the directory has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.logos.is_empty()
    }
}

impl<N: Into<String>, U: Into<String>> FromIterator<(N, U)> for PublisherDirectory {
    fn from_iter<I: IntoIterator<Item = (N, U)>>(iter: I) -> Self {
        let mut directory = Self::new();
        for (name, url) in iter {
            directory.insert(name, url);
        }
        directory
    }
}

/// Turns storage-relative asset paths into absolute URLs.
#[derive(Debug, Clone)]
pub struct AssetLocator {
    base: Option<Url>,
}

impl AssetLocator {
    /// Creates a locator rooted at `base`. An unparseable base leaves relative
    /// paths untouched, and the downloader later reports them as invalid URLs.
    #[must_use]
    pub fn new(base: &str) -> Self {
        let mut normalized = base.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        Self {
            base: Url::parse(&normalized).ok(),
        }
    }

    /// Returns `raw` unchanged when it is already an http(s) URL, else joins it
    /// onto the base.
    #[must_use]
    pub fn absolute(&self, raw: &str) -> String {
        let raw = raw.trim();
        if let Ok(parsed) = Url::parse(raw)
            && matches!(parsed.scheme(), "http" | "https")
        {
            return raw.to_string();
        }
        match &self.base {
            Some(base) => base
                .join(raw)
                .map(String::from)
                .unwrap_or_else(|_| raw.to_string()),
            None => raw.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireGroup {
    id: Option<RecordId>,
    code: Option<String>,
    name: Option<String>,
    question_type: Option<String>,
    publisher: Option<WirePublisherRef>,
    publisher_name: Option<String>,
    logo_url: Option<String>,
    available_logos: Option<Vec<String>>,
    image_path: Option<String>,
    image_url: Option<String>,
    questions: Vec<WireQuestion>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WirePublisherRef {
    Name(String),
    Object {
        name: Option<String>,
        logo_url: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct WireQuestion {
    id: RecordId,
    question_text: Option<String>,
    text: Option<String>,
    question_type: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    category_id: Option<RecordId>,
    image_path: Option<String>,
    image_url: Option<String>,
    question_image: Option<String>,
    answers: Option<Vec<WireAnswer>>,
}

#[derive(Debug, Deserialize)]
struct WireAnswer {
    answer_text: Option<String>,
    text: Option<String>,
    is_correct: Option<LooseBool>,
    image_path: Option<String>,
    image_url: Option<String>,
    answer_image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePublisher {
    name: Option<String>,
    logo_url: Option<String>,
}

/// Booleans arrive as `true`, `1`, or `"1"` depending on the serializer.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LooseBool {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl LooseBool {
    fn truthy(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Int(value) => *value != 0,
            Self::Text(value) => matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            ),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn first_text(candidates: [Option<String>; 2]) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|text| !text.trim().is_empty())
        .unwrap_or_default()
}

fn first_non_blank<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates.into_iter().find_map(non_blank)
}

/// Strips a `{"data": ...}` envelope unless the object already carries `marker`.
fn unwrap_envelope(body: Value, marker: Option<&str>) -> Value {
    match body {
        Value::Object(mut map)
            if map.contains_key("data") && marker.is_none_or(|key| !map.contains_key(key)) =>
        {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Decodes a group body into a normalized record.
pub(crate) fn decode_group(
    body: Value,
    requested_code: &str,
    assets: &AssetLocator,
) -> Result<RemoteGroupRecord, String> {
    let body = unwrap_envelope(body, Some("questions"));
    let wire: WireGroup = serde_json::from_value(body).map_err(|e| e.to_string())?;
    Ok(RemoteGroupRecord::from_wire(wire, requested_code, assets))
}

/// Decodes a publisher listing into a directory.
pub(crate) fn decode_publishers(
    body: Value,
    assets: &AssetLocator,
) -> Result<PublisherDirectory, String> {
    let body = unwrap_envelope(body, None);
    let wire: Vec<WirePublisher> = serde_json::from_value(body).map_err(|e| e.to_string())?;
    Ok(wire
        .into_iter()
        .filter_map(|publisher| {
            let name = non_blank(publisher.name)?;
            let logo_url = non_blank(publisher.logo_url)?;
            Some((name, assets.absolute(&logo_url)))
        })
        .collect())
}

impl RemoteGroupRecord {
    fn from_wire(wire: WireGroup, requested_code: &str, assets: &AssetLocator) -> Self {
        let (ref_name, ref_logo) = match wire.publisher {
            Some(WirePublisherRef::Name(name)) => (Some(name), None),
            Some(WirePublisherRef::Object { name, logo_url }) => (name, logo_url),
            None => (None, None),
        };
        let publisher_name = first_non_blank([wire.publisher_name, ref_name]);
        let logo_url = first_non_blank([wire.logo_url, ref_logo]).map(|url| assets.absolute(&url));
        let question_type =
            non_blank(wire.question_type).unwrap_or_else(|| DEFAULT_QUESTION_TYPE.to_string());
        let image_path =
            first_non_blank([wire.image_path, wire.image_url]).map(|path| assets.absolute(&path));
        let available_logos = wire
            .available_logos
            .unwrap_or_default()
            .into_iter()
            .filter_map(|path| non_blank(Some(path)))
            .map(|path| AvailableLogo {
                url: assets.absolute(&path),
                path,
            })
            .collect();
        let questions = wire
            .questions
            .into_iter()
            .map(|question| RemoteQuestion::from_wire(question, &question_type, assets))
            .collect();
        let code = non_blank(wire.code).unwrap_or_else(|| requested_code.to_string());

        Self {
            id: wire.id.unwrap_or_else(|| RecordId::Text(code.clone())),
            code,
            name: wire.name.unwrap_or_default(),
            question_type,
            publisher_name,
            logo_url,
            image_path,
            available_logos,
            questions,
        }
    }
}

impl RemoteQuestion {
    fn from_wire(wire: WireQuestion, group_type: &str, assets: &AssetLocator) -> Self {
        let answers = wire
            .answers
            .unwrap_or_default()
            .into_iter()
            .map(|answer| RemoteAnswer {
                text: first_text([answer.answer_text, answer.text]),
                is_correct: answer.is_correct.as_ref().is_some_and(LooseBool::truthy),
                image_url: first_non_blank([
                    answer.image_path,
                    answer.image_url,
                    answer.answer_image,
                ])
                .map(|url| assets.absolute(&url)),
            })
            .collect();

        Self {
            id: wire.id,
            text: first_text([wire.question_text, wire.text]),
            question_type: first_non_blank([wire.question_type, wire.kind])
                .unwrap_or_else(|| group_type.to_string()),
            category_id: wire.category_id,
            image_url: first_non_blank([wire.image_path, wire.image_url, wire.question_image])
                .map(|url| assets.absolute(&url)),
            answers,
        }
    }
}
