//! Core domain types for plugsync catalogs and comparisons.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlugsyncError;

/// Normalize an artifact name for matching: lowercase and trim.
///
/// Punctuation and word order are left alone, so "WP Rocket" and "wp-rocket"
/// stay distinct names.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Origin / ArtifactKind
// ---------------------------------------------------------------------------

/// Which of the two scraped sites a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    SiteA,
    SiteB,
}

impl Origin {
    pub const ALL: [Origin; 2] = [Origin::SiteA, Origin::SiteB];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SiteA => "site_a",
            Self::SiteB => "site_b",
        }
    }

    /// The other site.
    pub fn counterpart(self) -> Self {
        match self {
            Self::SiteA => Self::SiteB,
            Self::SiteB => Self::SiteA,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Origin {
    type Err = PlugsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "site_a" | "a" => Ok(Self::SiteA),
            "site_b" | "b" => Ok(Self::SiteB),
            other => Err(PlugsyncError::parse(format!("unknown origin '{other}'"))),
        }
    }
}

/// The kind of artifact a catalog lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Plugin,
    Theme,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Plugin, ArtifactKind::Theme];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plugin => "plugin",
            Self::Theme => "theme",
        }
    }

    /// Plural form used in task names and listing paths.
    pub fn plural(self) -> &'static str {
        match self {
            Self::Plugin => "plugins",
            Self::Theme => "themes",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = PlugsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plugin" | "plugins" => Ok(Self::Plugin),
            "theme" | "themes" => Ok(Self::Theme),
            other => Err(PlugsyncError::parse(format!("unknown artifact kind '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// ArtifactRecord
// ---------------------------------------------------------------------------

/// A named, versioned plugin or theme listed by one site.
///
/// Records are never mutated once produced; derived data lives in
/// [`ComparisonEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Cleaned artifact name.
    pub name: String,
    /// Version string as listed (may be empty).
    #[serde(default)]
    pub version: String,
    /// Listing or download page URL.
    #[serde(default)]
    pub source_url: String,
    /// Site the record was scraped from.
    pub origin: Origin,
    /// Listing title before name/version extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_title: Option<String>,
}

impl ArtifactRecord {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        source_url: impl Into<String>,
        origin: Origin,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            source_url: source_url.into(),
            origin,
            raw_title: None,
        }
    }

    /// Attach the original listing title.
    pub fn with_raw_title(mut self, title: impl Into<String>) -> Self {
        self.raw_title = Some(title.into());
        self
    }

    /// The name as used for matching.
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

// ---------------------------------------------------------------------------
// Classification / version relation
// ---------------------------------------------------------------------------

/// How a subject artifact was paired with a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchClassification {
    /// Names are equal after normalization.
    Exact,
    /// Similarity cleared the threshold but is below 1.0.
    Similar,
    /// A user override forced the match.
    Manual,
    /// No candidate cleared the threshold.
    #[serde(rename = "none")]
    NoMatch,
    /// The subject is excluded; no match was attempted.
    Blacklisted,
}

impl MatchClassification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Similar => "similar",
            Self::Manual => "manual",
            Self::NoMatch => "none",
            Self::Blacklisted => "blacklisted",
        }
    }

    /// Whether the entry pairs the subject with a candidate.
    pub fn is_matched(self) -> bool {
        matches!(self, Self::Exact | Self::Similar | Self::Manual)
    }
}

impl fmt::Display for MatchClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchClassification {
    type Err = PlugsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "similar" => Ok(Self::Similar),
            "manual" => Ok(Self::Manual),
            "none" => Ok(Self::NoMatch),
            "blacklisted" => Ok(Self::Blacklisted),
            other => Err(PlugsyncError::parse(format!(
                "unknown match classification '{other}'"
            ))),
        }
    }
}

/// Version of the subject relative to its match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionRelation {
    Older,
    Same,
    Newer,
    Unknown,
}

impl VersionRelation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Older => "older",
            Self::Same => "same",
            Self::Newer => "newer",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VersionRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionRelation {
    type Err = PlugsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "older" => Ok(Self::Older),
            "same" => Ok(Self::Same),
            "newer" => Ok(Self::Newer),
            "unknown" => Ok(Self::Unknown),
            other => Err(PlugsyncError::parse(format!(
                "unknown version relation '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ComparisonEntry
// ---------------------------------------------------------------------------

/// Reconciliation outcome for one subject artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    /// The artifact being looked up.
    pub subject: ArtifactRecord,
    /// The paired candidate, if any.
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<ArtifactRecord>,
    pub classification: MatchClassification,
    /// Name similarity; present only for exact and similar matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    pub version_relation: VersionRelation,
}

// ---------------------------------------------------------------------------
// Overrides / exclusions
// ---------------------------------------------------------------------------

/// User-supplied forced matches, keyed by normalized subject name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideTable {
    entries: HashMap<String, ArtifactRecord>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force `subject` to match `target`. Returns the previous override, if any.
    pub fn insert(&mut self, subject: &str, target: ArtifactRecord) -> Option<ArtifactRecord> {
        self.entries.insert(normalize_name(subject), target)
    }

    pub fn remove(&mut self, subject: &str) -> Option<ArtifactRecord> {
        self.entries.remove(&normalize_name(subject))
    }

    /// Look up the override for a subject name (normalized before lookup).
    pub fn get(&self, subject: &str) -> Option<&ArtifactRecord> {
        self.entries.get(&normalize_name(subject))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(normalized subject, target)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArtifactRecord)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<S: AsRef<str>> FromIterator<(S, ArtifactRecord)> for OverrideTable {
    fn from_iter<I: IntoIterator<Item = (S, ArtifactRecord)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (subject, target) in iter {
            table.insert(subject.as_ref(), target);
        }
        table
    }
}

/// Names to skip entirely during reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExclusionSet {
    names: HashSet<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the name was not already excluded.
    pub fn insert(&mut self, name: &str) -> bool {
        self.names.insert(normalize_name(name))
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.names.remove(&normalize_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&normalize_name(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}

// ---------------------------------------------------------------------------
// ComparisonId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for stored comparison runs (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComparisonId(pub Uuid);

impl ComparisonId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ComparisonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ComparisonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ComparisonId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_only_trims_and_lowercases() {
        assert_eq!(normalize_name("  Elementor PRO "), "elementor pro");
        assert_eq!(normalize_name("WP-Rocket"), "wp-rocket");
        assert_ne!(normalize_name("WP Rocket"), normalize_name("Wp-Rocket"));
    }

    #[test]
    fn override_table_normalizes_keys() {
        let target = ArtifactRecord::new("Yoast SEO", "22.0", "", Origin::SiteB);
        let mut table = OverrideTable::new();
        table.insert("  Yoast Premium ", target.clone());

        assert_eq!(table.get("yoast premium"), Some(&target));
        assert_eq!(table.get("YOAST PREMIUM"), Some(&target));
        assert_eq!(table.len(), 1);
        assert!(table.remove("Yoast Premium").is_some());
        assert!(table.is_empty());
    }

    #[test]
    fn exclusion_set_normalizes() {
        let set: ExclusionSet = ["Hello Dolly", " akismet"].into_iter().collect();
        assert!(set.contains("hello dolly"));
        assert!(set.contains("AKISMET "));
        assert!(!set.contains("jetpack"));
    }

    #[test]
    fn entry_serializes_match_field() {
        let entry = ComparisonEntry {
            subject: ArtifactRecord::new("akismet", "5.0", "", Origin::SiteA),
            matched: None,
            classification: MatchClassification::NoMatch,
            similarity: None,
            version_relation: VersionRelation::Unknown,
        };
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json["classification"], "none");
        assert!(json.get("match").is_none());
        assert!(json.get("similarity").is_none());

        let parsed: ComparisonEntry = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, entry);
    }

    #[test]
    fn enum_string_roundtrip() {
        for kind in ArtifactKind::ALL {
            assert_eq!(kind.as_str().parse::<ArtifactKind>().unwrap(), kind);
        }
        for origin in Origin::ALL {
            assert_eq!(origin.as_str().parse::<Origin>().unwrap(), origin);
        }
        assert_eq!("none".parse::<MatchClassification>().unwrap(), MatchClassification::NoMatch);
        assert!("sideways".parse::<VersionRelation>().is_err());
    }

    #[test]
    fn comparison_id_roundtrip() {
        let id = ComparisonId::new();
        let parsed: ComparisonId = id.to_string().parse().expect("parse ComparisonId");
        assert_eq!(id, parsed);
    }
}
