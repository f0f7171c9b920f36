//! Approximate name matching.
//!
//! Names are compared after [`normalize_name`] (lowercase + trim only) using a
//! Ratcliff/Obershelp ratio: twice the number of characters in matching blocks
//! divided by the combined length.

use plugsync_shared::{
    ArtifactRecord, MIN_THRESHOLD, MatchClassification, PlugsyncError, Result, normalize_name,
    validate_threshold,
};

/// Threshold used when none is configured.
pub const DEFAULT_THRESHOLD: f64 = MIN_THRESHOLD;

/// Similarity of two names in `[0, 1]`, symmetric in its arguments.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);

    // The block search is order-sensitive; a fixed argument order keeps the
    // score symmetric.
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let first: Vec<char> = first.chars().collect();
    let second: Vec<char> = second.chars().collect();

    let total = first.len() + second.len();
    if total == 0 {
        return 1.0;
    }

    let matches = matching_characters(&first, &second);
    (2 * matches) as f64 / total as f64
}

/// Total length of the matching blocks found by recursive longest-block search.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_block(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    total
}

/// Longest common substring of `a[alo..ahi]` and `b[blo..bhi]`.
/// Returns `(start_in_a, start_in_b, len)`; the earliest block wins ties.
fn longest_block(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo + 1;
            curr[col] = if a[i] == b[j] { prev[col - 1] + 1 } else { 0 };
            if curr[col] > best_len {
                best_len = curr[col];
                best_i = i + 1 - best_len;
                best_j = j + 1 - best_len;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_len)
}

/// Highest-scoring candidate for a subject.
#[derive(Debug, Clone, Copy)]
pub struct BestMatch<'a> {
    pub candidate: &'a ArtifactRecord,
    pub score: f64,
}

/// Scores and classifies name pairs against a similarity threshold.
#[derive(Debug, Clone, Copy)]
pub struct NameMatcher {
    threshold: f64,
}

impl NameMatcher {
    /// Create a matcher; the threshold must lie in `[0.80, 1.00]`.
    pub fn new(threshold: f64) -> Result<Self> {
        let threshold = validate_threshold(threshold).map_err(|err| match err {
            PlugsyncError::Config { message } => PlugsyncError::malformed(message),
            other => other,
        })?;
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn score(&self, a: &str, b: &str) -> f64 {
        similarity(a, b)
    }

    /// Classification precedence: excluded, override, exact, similar, none.
    pub fn classify(&self, score: f64, has_override: bool, is_excluded: bool) -> MatchClassification {
        if is_excluded {
            MatchClassification::Blacklisted
        } else if has_override {
            MatchClassification::Manual
        } else if score >= 1.0 {
            MatchClassification::Exact
        } else if score >= self.threshold {
            MatchClassification::Similar
        } else {
            MatchClassification::NoMatch
        }
    }

    /// The candidate with the highest score; on a tie the first one in `pool`.
    /// `None` only when the pool is empty.
    pub fn best_match<'a>(&self, subject: &str, pool: &'a [ArtifactRecord]) -> Option<BestMatch<'a>> {
        let mut best: Option<BestMatch<'a>> = None;

        for candidate in pool {
            let score = self.score(subject, &candidate.name);
            if best.is_none_or(|b| score > b.score) {
                best = Some(BestMatch { candidate, score });
            }
        }

        best
    }
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugsync_shared::Origin;

    fn record(name: &str) -> ArtifactRecord {
        ArtifactRecord::new(name, "1.0", "", Origin::SiteB)
    }

    #[test]
    fn identical_names_score_one() {
        for name in ["", "a", "Elementor Pro", "WooCommerce Subscriptions", "ñandú"] {
            assert_eq!(similarity(name, name), 1.0, "{name:?}");
        }
        let matcher = NameMatcher::default();
        let score = matcher.score("Akismet", "  akismet ");
        assert_eq!(matcher.classify(score, false, false), MatchClassification::Exact);
    }

    #[test]
    fn score_is_symmetric() {
        let pairs = [
            ("elementor pro", "elementor"),
            ("abcd", "bcda"),
            ("wp rocket", "wp-rocket"),
            ("yoast seo premium", "seo by yoast"),
            ("", "akismet"),
            ("aaab", "abaa"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a), "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn known_ratios() {
        // 9 matching chars out of 13 + 9.
        let score = similarity("Elementor Pro", "Elementor");
        assert!((score - 18.0 / 22.0).abs() < 1e-12);

        assert_eq!(similarity("abcde", "abcdx"), 0.8);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert_eq!(similarity("", "x"), 0.0);
    }

    #[test]
    fn punctuation_is_not_normalized() {
        let score = similarity("WP Rocket", "Wp-Rocket");
        assert!(score < 1.0);
        assert!(score >= 0.8);
    }

    #[test]
    fn threshold_boundary() {
        let matcher = NameMatcher::default();
        assert_eq!(matcher.classify(0.80, false, false), MatchClassification::Similar);
        assert_eq!(matcher.classify(0.7999, false, false), MatchClassification::NoMatch);
        assert_eq!(
            matcher.classify(similarity("abcde", "abcdx"), false, false),
            MatchClassification::Similar
        );

        let strict = NameMatcher::new(0.95).unwrap();
        assert_eq!(strict.classify(0.9, false, false), MatchClassification::NoMatch);
    }

    #[test]
    fn classification_precedence() {
        let matcher = NameMatcher::default();
        assert_eq!(matcher.classify(1.0, true, true), MatchClassification::Blacklisted);
        assert_eq!(matcher.classify(1.0, true, false), MatchClassification::Manual);
        assert_eq!(matcher.classify(0.0, true, false), MatchClassification::Manual);
        assert_eq!(matcher.classify(1.0, false, false), MatchClassification::Exact);
    }

    #[test]
    fn threshold_range_is_enforced() {
        assert!(NameMatcher::new(0.80).is_ok());
        assert!(NameMatcher::new(1.0).is_ok());
        assert!(NameMatcher::new(0.79).is_err());
        assert!(NameMatcher::new(1.5).is_err());
        assert!(NameMatcher::new(f64::NAN).is_err());

        let err = NameMatcher::new(0.5).unwrap_err();
        assert!(matches!(err, PlugsyncError::MalformedInput { .. }));
        assert!(err.to_string().contains("outside [0.80, 1.00]"));
    }

    #[test]
    fn best_match_picks_highest_then_first() {
        let matcher = NameMatcher::default();
        let pool = vec![record("Jetpack"), record("Elementor"), record("Elementor Pro")];
        let best = matcher.best_match("elementor pro", &pool).unwrap();
        assert_eq!(best.candidate.name, "Elementor Pro");
        assert_eq!(best.score, 1.0);

        let tied = vec![record("abcdx"), record("abcdy")];
        let best = matcher.best_match("abcde", &tied).unwrap();
        assert_eq!(best.candidate.name, "abcdx");

        assert!(matcher.best_match("anything", &[]).is_none());
    }
}
