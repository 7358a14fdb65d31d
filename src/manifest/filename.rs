//! Deterministic local filenames for downloaded images.
//!
//! A name is `q{question_id}[_a{answer_index}]_{stem}{ext}`, where `stem` is
//! the sanitized base name of the remote file. The prefix keeps names unique
//! and non-empty even when the remote name sanitizes to nothing.

use std::collections::HashSet;

use url::Url;

use crate::remote::RecordId;

/// Upper bound on the sanitized remote stem, in characters.
const MAX_STEM_CHARS: usize = 64;

/// Upper bound on the sanitized question id inside a prefix, in characters.
const MAX_ID_CHARS: usize = 64;

/// Transliterates Turkish letters and circumflexed vowels to ASCII.
///
/// Characters outside that set pass through unchanged.
#[must_use]
pub fn fold_to_ascii(input: &str) -> String {
    input.chars().map(fold_char).collect()
}

fn fold_char(ch: char) -> char {
    match ch {
        'ç' => 'c',
        'Ç' => 'C',
        'ğ' => 'g',
        'Ğ' => 'G',
        'ı' | 'î' => 'i',
        'İ' | 'Î' => 'I',
        'ö' => 'o',
        'Ö' => 'O',
        'ş' => 's',
        'Ş' => 'S',
        'ü' | 'û' => 'u',
        'Ü' | 'Û' => 'U',
        'â' => 'a',
        'Â' => 'A',
        other => other,
    }
}

/// Keeps only `[A-Za-z0-9_]` after transliteration.
pub(crate) fn sanitize_component(value: &str) -> String {
    fold_to_ascii(value)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Returns the sanitized base name (no extension) of a remote asset URL.
pub(crate) fn remote_stem(remote_url: &str) -> String {
    let last_segment = match Url::parse(remote_url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string(),
        Err(_) => remote_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let decoded = urlencoding::decode(&last_segment)
        .map_or_else(|_| last_segment.clone(), std::borrow::Cow::into_owned);
    let stem = match decoded.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => decoded.as_str(),
    };
    sanitize_component(stem).chars().take(MAX_STEM_CHARS).collect()
}

/// Prefix for a question image.
pub(crate) fn question_prefix(question_id: &RecordId) -> String {
    let id: String = sanitize_component(&question_id.to_string())
        .chars()
        .take(MAX_ID_CHARS)
        .collect();
    format!("q{id}")
}

/// Prefix for an answer image.
pub(crate) fn answer_prefix(question_id: &RecordId, answer_index: usize) -> String {
    format!("{}_a{answer_index}", question_prefix(question_id))
}

/// Hands out unique filenames within one run.
///
/// Uniqueness is checked case-insensitively so the names also stay distinct
/// on case-folding filesystems. Ties get `_2`, `_3`, ... in claim order, so the
/// same input sequence always yields the same names.
#[derive(Debug, Default)]
pub(crate) struct FileNamer {
    used: HashSet<String>,
}

impl FileNamer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn claim(&mut self, prefix: &str, remote_url: &str, extension: &str) -> String {
        let stem = remote_stem(remote_url);
        let base = if stem.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix}_{stem}")
        };

        let mut candidate = format!("{base}{extension}");
        let mut suffix = 2_usize;
        while !self.used.insert(candidate.to_ascii_lowercase()) {
            candidate = format!("{base}_{suffix}{extension}");
            suffix += 1;
        }
        candidate
    }
}
