//! Reconciliation of two catalogs into classified comparison entries.
//!
//! [`reconcile`] is a pure function over read-only snapshots: no I/O and no
//! shared state, so independent calls may run on any thread at once.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use plugsync_shared::{
    ArtifactRecord, ComparisonEntry, ExclusionSet, MatchClassification, Origin, OverrideTable,
    PlugsyncError, Result, VersionRelation,
};

use crate::matcher::NameMatcher;
use crate::version::compare_versions;

/// Match every subject against the candidate pool.
///
/// Returns one entry per subject, in subject order. Each subject is scored
/// against the whole pool, so two subjects may share a candidate.
/// Cost is `|subjects| × |candidates|` name comparisons.
pub fn reconcile(
    subjects: &[ArtifactRecord],
    candidates: &[ArtifactRecord],
    overrides: &OverrideTable,
    exclusions: &ExclusionSet,
    threshold: f64,
) -> Result<Vec<ComparisonEntry>> {
    let matcher = NameMatcher::new(threshold)?;

    for (subject, target) in overrides.iter() {
        if target.name.trim().is_empty() {
            return Err(PlugsyncError::malformed(format!(
                "override for '{subject}' points at a record with an empty name"
            )));
        }
    }

    let entries: Vec<ComparisonEntry> = subjects
        .iter()
        .map(|subject| reconcile_one(&matcher, subject, candidates, overrides, exclusions))
        .collect();

    debug!(
        subjects = subjects.len(),
        candidates = candidates.len(),
        threshold,
        "reconciled catalogs"
    );

    Ok(entries)
}

fn reconcile_one(
    matcher: &NameMatcher,
    subject: &ArtifactRecord,
    candidates: &[ArtifactRecord],
    overrides: &OverrideTable,
    exclusions: &ExclusionSet,
) -> ComparisonEntry {
    if exclusions.contains(&subject.name) {
        return unmatched(subject, MatchClassification::Blacklisted);
    }

    if let Some(target) = overrides.get(&subject.name) {
        return ComparisonEntry {
            subject: subject.clone(),
            matched: Some(target.clone()),
            classification: MatchClassification::Manual,
            similarity: None,
            version_relation: compare_versions(&subject.version, &target.version),
        };
    }

    let Some(best) = matcher.best_match(&subject.name, candidates) else {
        return unmatched(subject, MatchClassification::NoMatch);
    };

    match matcher.classify(best.score, false, false) {
        classification @ (MatchClassification::Exact | MatchClassification::Similar) => {
            ComparisonEntry {
                subject: subject.clone(),
                matched: Some(best.candidate.clone()),
                classification,
                similarity: Some(best.score),
                version_relation: compare_versions(&subject.version, &best.candidate.version),
            }
        }
        _ => unmatched(subject, MatchClassification::NoMatch),
    }
}

fn unmatched(subject: &ArtifactRecord, classification: MatchClassification) -> ComparisonEntry {
    ComparisonEntry {
        subject: subject.clone(),
        matched: None,
        classification,
        similarity: None,
        version_relation: VersionRelation::Unknown,
    }
}

/// Candidates that no matched entry points at, in pool order.
///
/// A candidate is taken when some matched entry's record has the same origin
/// and normalized name. Override targets rebuilt from storage carry no raw
/// title and keep the name as typed, so whole-record equality would miss them.
pub fn unmatched_candidates(
    entries: &[ComparisonEntry],
    candidates: &[ArtifactRecord],
) -> Vec<ArtifactRecord> {
    let taken: HashSet<(Origin, String)> = entries
        .iter()
        .filter(|e| e.classification.is_matched())
        .filter_map(|e| e.matched.as_ref())
        .map(|m| (m.origin, m.normalized_name()))
        .collect();

    candidates
        .iter()
        .filter(|c| !taken.contains(&(c.origin, c.normalized_name())))
        .cloned()
        .collect()
}

/// Turn an override table around for a reversed comparison.
///
/// Overrides are stored as `site A subject -> site B target`. When site B is
/// the subject side, each target name becomes the key and the forced match is
/// the pool record carrying the original subject name. Subjects missing from
/// `pool` fall back to a bare record on `pool_origin` with no version.
pub fn invert_overrides(
    overrides: &OverrideTable,
    pool: &[ArtifactRecord],
    pool_origin: Origin,
) -> OverrideTable {
    overrides
        .iter()
        .map(|(subject, target)| {
            let matched = pool
                .iter()
                .find(|record| record.normalized_name() == subject)
                .cloned()
                .unwrap_or_else(|| ArtifactRecord::new(subject, "", "", pool_origin));
            (target.name.clone(), matched)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Entry counts for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub total: usize,
    pub exact: usize,
    pub similar: usize,
    pub manual: usize,
    pub unmatched: usize,
    pub blacklisted: usize,
    /// Matched subjects whose version is behind the match.
    pub older: usize,
    /// Matched subjects on the same version as the match.
    pub same: usize,
    /// Matched subjects whose version is ahead of the match.
    pub newer: usize,
    /// Matched subjects where either version is missing.
    pub unknown_version: usize,
}

impl ComparisonSummary {
    pub fn from_entries(entries: &[ComparisonEntry]) -> Self {
        let mut summary = Self {
            total: entries.len(),
            ..Self::default()
        };

        for entry in entries {
            match entry.classification {
                MatchClassification::Exact => summary.exact += 1,
                MatchClassification::Similar => summary.similar += 1,
                MatchClassification::Manual => summary.manual += 1,
                MatchClassification::NoMatch => summary.unmatched += 1,
                MatchClassification::Blacklisted => summary.blacklisted += 1,
            }

            if entry.classification.is_matched() {
                match entry.version_relation {
                    VersionRelation::Older => summary.older += 1,
                    VersionRelation::Same => summary.same += 1,
                    VersionRelation::Newer => summary.newer += 1,
                    VersionRelation::Unknown => summary.unknown_version += 1,
                }
            }
        }

        summary
    }

    /// Subjects paired with some candidate.
    pub fn matched(&self) -> usize {
        self.exact + self.similar + self.manual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(name: &str, version: &str) -> ArtifactRecord {
        ArtifactRecord::new(name, version, format!("https://a.example/{name}"), Origin::SiteA)
    }

    fn candidate(name: &str, version: &str) -> ArtifactRecord {
        ArtifactRecord::new(name, version, format!("https://b.example/{name}"), Origin::SiteB)
    }

    #[test]
    fn similar_match_with_older_version() {
        let entries = reconcile(
            &[subject("Elementor Pro", "3.18.1")],
            &[candidate("Elementor", "3.18.3")],
            &OverrideTable::new(),
            &ExclusionSet::new(),
            0.80,
        )
        .unwrap();

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.classification, MatchClassification::Similar);
        assert_eq!(entry.version_relation, VersionRelation::Older);
        assert_eq!(entry.matched.as_ref().unwrap().name, "Elementor");
        let similarity = entry.similarity.unwrap();
        assert!(similarity >= 0.80 && similarity < 1.0);
    }

    #[test]
    fn empty_pool_yields_no_match() {
        let entries = reconcile(
            &[subject("Akismet", "5.0")],
            &[],
            &OverrideTable::new(),
            &ExclusionSet::new(),
            0.80,
        )
        .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].classification, MatchClassification::NoMatch);
        assert_eq!(entries[0].version_relation, VersionRelation::Unknown);
        assert!(entries[0].matched.is_none());
        assert!(entries[0].similarity.is_none());
    }

    #[test]
    fn exclusion_wins_over_everything() {
        let exclusions: ExclusionSet = ["AKISMET"].into_iter().collect();
        let mut overrides = OverrideTable::new();
        overrides.insert("akismet", candidate("Akismet Anti-Spam", "5.3"));

        let entries = reconcile(
            &[subject("Akismet", "5.0")],
            &[candidate("Akismet", "5.0")],
            &overrides,
            &exclusions,
            0.80,
        )
        .unwrap();

        assert_eq!(entries[0].classification, MatchClassification::Blacklisted);
        assert!(entries[0].matched.is_none());
        assert!(entries[0].similarity.is_none());
        assert_eq!(entries[0].version_relation, VersionRelation::Unknown);
    }

    #[test]
    fn override_beats_exact_candidate() {
        let target = candidate("Yoast SEO", "22.1");
        let mut overrides = OverrideTable::new();
        overrides.insert("Yoast SEO Premium", target.clone());

        let entries = reconcile(
            &[subject("yoast seo premium", "22.0")],
            &[candidate("Yoast SEO Premium", "22.0"), target.clone()],
            &overrides,
            &ExclusionSet::new(),
            0.80,
        )
        .unwrap();

        let entry = &entries[0];
        assert_eq!(entry.classification, MatchClassification::Manual);
        assert_eq!(entry.matched.as_ref(), Some(&target));
        assert!(entry.similarity.is_none());
        assert_eq!(entry.version_relation, VersionRelation::Older);
    }

    #[test]
    fn exact_match_after_normalization() {
        let entries = reconcile(
            &[subject("  WooCommerce ", "8.5.2")],
            &[candidate("Jetpack", "13.0"), candidate("woocommerce", "8.5.2")],
            &OverrideTable::new(),
            &ExclusionSet::new(),
            0.80,
        )
        .unwrap();

        assert_eq!(entries[0].classification, MatchClassification::Exact);
        assert_eq!(entries[0].similarity, Some(1.0));
        assert_eq!(entries[0].version_relation, VersionRelation::Same);
    }

    #[test]
    fn below_threshold_is_no_match() {
        let entries = reconcile(
            &[subject("Rank Math", "1.0")],
            &[candidate("Jetpack", "13.0")],
            &OverrideTable::new(),
            &ExclusionSet::new(),
            0.80,
        )
        .unwrap();

        assert_eq!(entries[0].classification, MatchClassification::NoMatch);
        assert!(entries[0].matched.is_none());
    }

    #[test]
    fn preserves_subject_order_and_reuses_candidates() {
        let subjects = vec![
            subject("Elementor Pro", "3.18.1"),
            subject("Akismet", "5.0"),
            subject("Elementor", "3.18.3"),
        ];
        let candidates = vec![candidate("Elementor", "3.18.3")];

        let entries = reconcile(
            &subjects,
            &candidates,
            &OverrideTable::new(),
            &ExclusionSet::new(),
            0.80,
        )
        .unwrap();

        let names: Vec<&str> = entries.iter().map(|e| e.subject.name.as_str()).collect();
        assert_eq!(names, ["Elementor Pro", "Akismet", "Elementor"]);
        assert_eq!(entries[0].classification, MatchClassification::Similar);
        assert_eq!(entries[2].classification, MatchClassification::Exact);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let err = reconcile(&[], &[], &OverrideTable::new(), &ExclusionSet::new(), 0.5)
            .unwrap_err();
        assert!(matches!(err, PlugsyncError::MalformedInput { .. }));

        let mut overrides = OverrideTable::new();
        overrides.insert("akismet", candidate("  ", "1.0"));
        let err = reconcile(&[], &[], &overrides, &ExclusionSet::new(), 0.8).unwrap_err();
        assert!(err.to_string().contains("empty name"));
    }

    #[test]
    fn inputs_are_left_untouched() {
        let subjects = vec![subject("Elementor Pro", "3.18.1")];
        let candidates = vec![candidate("Elementor", "3.18.3")];
        let before = (subjects.clone(), candidates.clone());

        reconcile(
            &subjects,
            &candidates,
            &OverrideTable::new(),
            &ExclusionSet::new(),
            0.8,
        )
        .unwrap();

        assert_eq!((subjects, candidates), before);
    }

    #[test]
    fn summary_and_unmatched_candidates() {
        let subjects = vec![
            subject("Elementor Pro", "3.18.1"),
            subject("WooCommerce", "8.6.0"),
            subject("Akismet", "5.0"),
            subject("Hello Dolly", "1.7"),
        ];
        let candidates = vec![
            candidate("Elementor", "3.18.3"),
            candidate("WooCommerce", "8.5.2"),
            candidate("Wordfence", "7.11"),
        ];
        let exclusions: ExclusionSet = ["hello dolly"].into_iter().collect();

        let entries = reconcile(&subjects, &candidates, &OverrideTable::new(), &exclusions, 0.8)
            .unwrap();
        let summary = ComparisonSummary::from_entries(&entries);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.exact, 1);
        assert_eq!(summary.similar, 1);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(summary.blacklisted, 1);
        assert_eq!(summary.matched(), 2);
        assert_eq!(summary.older, 1);
        assert_eq!(summary.newer, 1);

        let leftovers = unmatched_candidates(&entries, &candidates);
        assert_eq!(leftovers.len(), 1);
        assert_eq!(leftovers[0].name, "Wordfence");
    }

    #[test]
    fn manual_target_consumes_pool_record() {
        let pool = vec![
            candidate("elementor", "3.18.3").with_raw_title("Elementor v3.18.3"),
            candidate("wordfence", "7.11").with_raw_title("Wordfence 7.11"),
        ];
        // Stored overrides keep the name as typed and no raw title.
        let mut overrides = OverrideTable::new();
        overrides.insert("Elementor Pro", candidate("Elementor", "3.18.3"));

        let entries = reconcile(
            &[subject("Elementor Pro", "3.18.1")],
            &pool,
            &overrides,
            &ExclusionSet::new(),
            0.8,
        )
        .unwrap();
        assert_eq!(entries[0].classification, MatchClassification::Manual);

        let leftovers = unmatched_candidates(&entries, &pool);
        let names: Vec<&str> = leftovers.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["wordfence"]);
    }

    #[test]
    fn unmatched_entries_and_other_origins_do_not_consume() {
        let pool = vec![candidate("akismet", "5.0")];
        let entries = vec![
            unmatched(&subject("Hello Dolly", "1.7"), MatchClassification::NoMatch),
            ComparisonEntry {
                subject: subject("Akismet", "5.0"),
                matched: Some(subject("akismet", "5.0")),
                classification: MatchClassification::Manual,
                similarity: None,
                version_relation: VersionRelation::Same,
            },
        ];

        assert_eq!(unmatched_candidates(&entries, &pool), pool);
    }

    #[test]
    fn reversed_overrides_point_back_at_subject_side() {
        let mut overrides = OverrideTable::new();
        overrides.insert("Elementor Pro", candidate("Elementor", "3.18.3"));
        overrides.insert("Rank Math SEO", candidate("Rank Math", "1.0.210"));

        // Site A is now the candidate pool.
        let site_a = vec![
            subject("elementor pro", "3.18.1"),
            subject("elementor pro addons", "1.2"),
        ];
        let inverted = invert_overrides(&overrides, &site_a, Origin::SiteA);

        assert_eq!(inverted.len(), 2);
        assert_eq!(inverted.get("ELEMENTOR"), Some(&site_a[0]));
        let fallback = inverted.get("rank math").unwrap();
        assert_eq!(fallback.name, "rank math seo");
        assert_eq!(fallback.origin, Origin::SiteA);
        assert!(fallback.version.is_empty());

        let entries = reconcile(
            &[candidate("Elementor", "3.18.3")],
            &site_a,
            &inverted,
            &ExclusionSet::new(),
            0.8,
        )
        .unwrap();
        let entry = &entries[0];
        assert_eq!(entry.classification, MatchClassification::Manual);
        assert_eq!(entry.matched.as_ref(), Some(&site_a[0]));
        assert_eq!(entry.matched.as_ref().unwrap().origin, Origin::SiteA);
        assert_eq!(entry.version_relation, VersionRelation::Newer);
        assert_eq!(unmatched_candidates(&entries, &site_a), [site_a[1].clone()]);
    }
}
