//! Publisher logo resolution.
//!
//! A group's logo can come from four places, tried in order:
//!
//! 1. the publisher directory entry for the group's publisher name
//! 2. the group's own `logo_url`
//! 3. the logos listed in publisher storage (name match, then newest)
//! 4. the group image, as a stand-in
//!
//! When none applies the result carries no URL and [`LogoTier::None`].

mod timestamps;

pub use timestamps::{ModifiedTimeLookup, NoTimestamps, StorageDirTimestamps};

use serde::Serialize;
use tracing::debug;

use crate::manifest::fold_to_ascii;
use crate::remote::{AvailableLogo, PublisherDirectory, RemoteGroupRecord};

/// Which fallback tier produced a logo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoTier {
    /// Publisher directory lookup by exact name.
    PublisherMap,
    /// The group's own `logo_url` field.
    GroupOwnField,
    /// Chosen among storage logos, or the group image stand-in.
    AvailableLogosHeuristic,
    /// No logo found.
    None,
}

/// How the heuristic tier picked its candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicDetail {
    /// File name contains the publisher name.
    NameMatch,
    /// Newest candidate by modification time.
    MostRecentlyModified,
    /// No candidate had a modification time; the last listed entry was used.
    LastListed,
    /// The group image substitutes for a logo.
    GroupImageSubstitute,
}

/// Outcome of logo resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLogo {
    /// Absolute URL of the logo, if any tier produced one.
    pub url: Option<String>,
    /// Tier that produced the URL.
    pub tier: LogoTier,
    /// Heuristic detail, set only for [`LogoTier::AvailableLogosHeuristic`].
    pub detail: Option<HeuristicDetail>,
}

impl ResolvedLogo {
    /// The "no logo" result.
    #[must_use]
    pub fn none() -> Self {
        Self {
            url: None,
            tier: LogoTier::None,
            detail: None,
        }
    }

    fn found(url: &str, tier: LogoTier, detail: Option<HeuristicDetail>) -> Self {
        Self {
            url: Some(url.to_string()),
            tier,
            detail,
        }
    }

    /// True when the group image is standing in for a real logo.
    #[must_use]
    pub fn is_substitute(&self) -> bool {
        self.detail == Some(HeuristicDetail::GroupImageSubstitute)
    }
}

struct LogoInputs<'a> {
    record: &'a RemoteGroupRecord,
    directory: &'a PublisherDirectory,
    timestamps: &'a dyn ModifiedTimeLookup,
}

type TierFn = fn(&LogoInputs<'_>) -> Option<ResolvedLogo>;

const TIERS: [(&str, TierFn); 4] = [
    ("publisher_map", from_publisher_map),
    ("group_own_field", from_group_field),
    ("available_logos", from_available_logos),
    ("group_image", from_group_image),
];

/// Resolves the logo for `record`. First matching tier wins.
#[must_use]
pub fn resolve(
    record: &RemoteGroupRecord,
    directory: &PublisherDirectory,
    timestamps: &dyn ModifiedTimeLookup,
) -> ResolvedLogo {
    let inputs = LogoInputs {
        record,
        directory,
        timestamps,
    };
    for (name, tier) in TIERS {
        if let Some(resolved) = tier(&inputs) {
            debug!(tier = name, url = ?resolved.url, detail = ?resolved.detail, "logo resolved");
            return resolved;
        }
    }
    debug!(code = %record.code, "no logo at any tier");
    ResolvedLogo::none()
}

fn from_publisher_map(inputs: &LogoInputs<'_>) -> Option<ResolvedLogo> {
    let name = inputs.record.publisher_name.as_deref()?;
    let url = inputs.directory.logo_for(name)?;
    Some(ResolvedLogo::found(url, LogoTier::PublisherMap, None))
}

fn from_group_field(inputs: &LogoInputs<'_>) -> Option<ResolvedLogo> {
    let url = inputs.record.logo_url.as_deref()?;
    Some(ResolvedLogo::found(url, LogoTier::GroupOwnField, None))
}

fn from_available_logos(inputs: &LogoInputs<'_>) -> Option<ResolvedLogo> {
    let logos = &inputs.record.available_logos;
    if logos.is_empty() {
        return None;
    }

    if let Some(name) = inputs.record.publisher_name.as_deref()
        && let Some(hit) = logos.iter().find(|logo| name_matches(logo, name))
    {
        return Some(ResolvedLogo::found(
            &hit.url,
            LogoTier::AvailableLogosHeuristic,
            Some(HeuristicDetail::NameMatch),
        ));
    }

    let newest = logos
        .iter()
        .enumerate()
        .filter_map(|(index, logo)| inputs.timestamps.modified(logo).map(|t| (t, index, logo)))
        .max_by_key(|(time, index, _)| (*time, *index));

    match newest {
        Some((_, _, logo)) => Some(ResolvedLogo::found(
            &logo.url,
            LogoTier::AvailableLogosHeuristic,
            Some(HeuristicDetail::MostRecentlyModified),
        )),
        None => logos.last().map(|logo| {
            ResolvedLogo::found(
                &logo.url,
                LogoTier::AvailableLogosHeuristic,
                Some(HeuristicDetail::LastListed),
            )
        }),
    }
}

fn from_group_image(inputs: &LogoInputs<'_>) -> Option<ResolvedLogo> {
    let url = inputs.record.image_path.as_deref()?;
    Some(ResolvedLogo::found(
        url,
        LogoTier::AvailableLogosHeuristic,
        Some(HeuristicDetail::GroupImageSubstitute),
    ))
}

fn name_matches(logo: &AvailableLogo, publisher_name: &str) -> bool {
    let needle = publisher_name.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    let file_name = logo.file_name();
    if file_name.to_lowercase().contains(&needle) {
        return true;
    }
    let squashed_needle = squash(publisher_name);
    !squashed_needle.is_empty() && squash(file_name).contains(&squashed_needle)
}

/// Lowercase ASCII alphanumerics only, after transliteration.
fn squash(value: &str) -> String {
    fold_to_ascii(value)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::remote::RecordId;
    use std::collections::HashMap;
    use std::time::{Duration, SystemTime};

    struct FixedTimes(HashMap<String, SystemTime>);

    impl ModifiedTimeLookup for FixedTimes {
        fn modified(&self, logo: &AvailableLogo) -> Option<SystemTime> {
            self.0.get(&logo.path).copied()
        }
    }

    fn record() -> RemoteGroupRecord {
        RemoteGroupRecord {
            id: RecordId::Number(1),
            code: "ABC123".to_string(),
            name: "Test".to_string(),
            question_type: "multiple_choice".to_string(),
            publisher_name: None,
            logo_url: None,
            image_path: None,
            available_logos: Vec::new(),
            questions: Vec::new(),
        }
    }

    fn logo(path: &str) -> AvailableLogo {
        AvailableLogo {
            path: path.to_string(),
            url: format!("https://cdn.example.com/{path}"),
        }
    }

    #[test]
    fn test_publisher_map_wins_over_group_field() {
        let mut record = record();
        record.publisher_name = Some("MEB Yayınları".to_string());
        record.logo_url = Some("https://x/own.png".to_string());
        let directory: PublisherDirectory = [("MEB Yayınları", "https://x/meb.png")]
            .into_iter()
            .collect();

        let resolved = resolve(&record, &directory, &NoTimestamps);

        assert_eq!(resolved.url.as_deref(), Some("https://x/meb.png"));
        assert_eq!(resolved.tier, LogoTier::PublisherMap);
        assert_eq!(resolved.detail, None);
    }

    #[test]
    fn test_directory_lookup_is_case_sensitive() {
        let mut record = record();
        record.publisher_name = Some("meb yayınları".to_string());
        record.logo_url = Some("https://x/own.png".to_string());
        let directory: PublisherDirectory = [("MEB Yayınları", "https://x/meb.png")]
            .into_iter()
            .collect();

        let resolved = resolve(&record, &directory, &NoTimestamps);
        assert_eq!(resolved.tier, LogoTier::GroupOwnField);
    }

    #[test]
    fn test_group_field_used_when_publisher_missing_from_directory() {
        let mut record = record();
        record.publisher_name = Some("Unknown".to_string());
        record.logo_url = Some("https://x/own.png".to_string());

        let resolved = resolve(&record, &PublisherDirectory::new(), &NoTimestamps);
        assert_eq!(resolved.url.as_deref(), Some("https://x/own.png"));
        assert_eq!(resolved.tier, LogoTier::GroupOwnField);
    }

    #[test]
    fn test_available_logos_name_match_with_transliteration() {
        let mut record = record();
        record.publisher_name = Some("MEB Yayınları".to_string());
        record.available_logos = vec![logo("logos/other.png"), logo("logos/meb_yayinlari.png")];

        let resolved = resolve(&record, &PublisherDirectory::new(), &NoTimestamps);

        assert_eq!(
            resolved.url.as_deref(),
            Some("https://cdn.example.com/logos/meb_yayinlari.png")
        );
        assert_eq!(resolved.detail, Some(HeuristicDetail::NameMatch));
    }

    #[test]
    fn test_available_logos_plain_substring_match_ignores_case() {
        let mut record = record();
        record.publisher_name = Some("  Acme ".to_string());
        record.available_logos = vec![logo("ACME-logo.png"), logo("zzz.png")];

        let resolved = resolve(&record, &PublisherDirectory::new(), &NoTimestamps);
        assert_eq!(
            resolved.url.as_deref(),
            Some("https://cdn.example.com/ACME-logo.png")
        );
    }

    #[test]
    fn test_available_logos_newest_when_no_name_match() {
        let mut record = record();
        record.publisher_name = Some("Nobody".to_string());
        record.available_logos = vec![logo("a.png"), logo("b.png"), logo("c.png")];
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        let times = FixedTimes(HashMap::from([
            ("a.png".to_string(), base + Duration::from_secs(50)),
            ("b.png".to_string(), base),
        ]));

        let resolved = resolve(&record, &PublisherDirectory::new(), &times);

        assert_eq!(
            resolved.url.as_deref(),
            Some("https://cdn.example.com/a.png")
        );
        assert_eq!(resolved.detail, Some(HeuristicDetail::MostRecentlyModified));
    }

    #[test]
    fn test_available_logos_last_listed_without_timestamps() {
        let mut record = record();
        record.available_logos = vec![logo("a.png"), logo("b.png")];

        let resolved = resolve(&record, &PublisherDirectory::new(), &NoTimestamps);
        assert_eq!(
            resolved.url.as_deref(),
            Some("https://cdn.example.com/b.png")
        );
        assert_eq!(resolved.detail, Some(HeuristicDetail::LastListed));
    }

    #[test]
    fn test_group_image_substitutes_for_logo() {
        let mut record = record();
        record.image_path = Some("https://x/group.png".to_string());

        let resolved = resolve(&record, &PublisherDirectory::new(), &NoTimestamps);
        assert_eq!(resolved.tier, LogoTier::AvailableLogosHeuristic);
        assert!(resolved.is_substitute());
        assert_eq!(resolved.url.as_deref(), Some("https://x/group.png"));
    }

    #[test]
    fn test_no_source_yields_none_tier() {
        let resolved = resolve(&record(), &PublisherDirectory::new(), &NoTimestamps);
        assert_eq!(resolved, ResolvedLogo::none());
    }

    #[test]
    fn test_squash_folds_turkish_letters() {
        assert_eq!(squash("MEB Yayınları"), "mebyayinlari");
        assert_eq!(squash("İstanbul Şehir"), "istanbulsehir");
    }
}
