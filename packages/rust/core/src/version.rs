//! Permissive dotted-version comparison.
//!
//! Source sites do not guarantee well-formed version strings, so parsing never
//! fails: a segment that is not a non-negative integer counts as `0`, and only
//! an empty version is incomparable.

use std::cmp::Ordering;

use plugsync_shared::VersionRelation;

/// A dotted version parsed into numeric segments.
///
/// Trailing zero segments are insignificant: `3.18` == `3.18.0`.
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<u64>,
}

impl Version {
    /// Parse a version string. Returns `None` only for empty (or blank) input.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let segments = raw
            .split('.')
            .map(|segment| segment.trim().parse::<u64>().unwrap_or(0))
            .collect();

        Some(Self { segments })
    }

    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    fn segment(&self, index: usize) -> u64 {
        self.segments.get(index).copied().unwrap_or(0)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        (0..len)
            .map(|i| self.segment(i).cmp(&other.segment(i)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for Version {}

/// Compare `a` relative to `b`.
pub fn compare_versions(a: &str, b: &str) -> VersionRelation {
    match (Version::parse(a), Version::parse(b)) {
        (Some(a), Some(b)) => match a.cmp(&b) {
            Ordering::Less => VersionRelation::Older,
            Ordering::Equal => VersionRelation::Same,
            Ordering::Greater => VersionRelation::Newer,
        },
        _ => VersionRelation::Unknown,
    }
}
