//! Name and version extraction from listing titles.
//!
//! Titles look like `"Elementor Pro v3.18.1 - Nulled"`; the cleaned name is
//! what gets matched across sites, so every rule here changes match results.

use std::sync::LazyLock;

use regex::Regex;

use plugsync_shared::ArtifactKind;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)v?(\d+\.\d+(?:\.\d+)?(?:\.\d+)?)").expect("valid regex")
});

/// First `v?N.N[.N[.N]]` in the title without the `v`, or an empty string.
pub fn extract_version(title: &str) -> String {
    VERSION_RE
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Reduce a listing title to a bare, lowercase artifact name.
///
/// Returns an empty string when nothing is left; callers drop such titles.
pub fn clean_name(title: &str, kind: ArtifactKind) -> String {
    static VERSION_STRIP_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"v?\d+\.\d+(?:\.\d+)?(?:\.\d+)?").expect("valid regex")
    });
    static PLUGIN_WORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\b(pro|premium|nulled|free|download|wordpress|plugin|version)\b")
            .expect("valid regex")
    });
    static THEME_WORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\b(pro|premium|nulled|free|download|wordpress|theme|version)\b")
            .expect("valid regex")
    });
    static TAIL_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s+[-–|]\s+.*$").expect("valid regex"));

    let name = VERSION_STRIP_RE.replace_all(title, "");
    let words = match kind {
        ArtifactKind::Plugin => &*PLUGIN_WORDS_RE,
        ArtifactKind::Theme => &*THEME_WORDS_RE,
    };
    let name = words.replace_all(&name, "");
    let name = TAIL_RE.replace(&name, "");
    let name = name.trim_matches(|c: char| matches!(c, ' ' | '-' | '–' | '|' | ':'));

    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_first_dotted_number() {
        assert_eq!(extract_version("Elementor Pro v3.18.1 - Nulled"), "3.18.1");
        assert_eq!(extract_version("Yoast SEO Premium 22.0"), "22.0");
        assert_eq!(extract_version("Astra V4.6.3.1 Theme"), "4.6.3.1");
        assert_eq!(extract_version("WP Rocket"), "");
        assert_eq!(extract_version("Version 2 of 3"), "");
    }

    #[test]
    fn name_drops_versions_and_marketing_words() {
        assert_eq!(
            clean_name("Elementor Pro v3.18.1 - Nulled", ArtifactKind::Plugin),
            "elementor"
        );
        assert_eq!(
            clean_name("WooCommerce Subscriptions 6.2.0 | Free Download", ArtifactKind::Plugin),
            "woocommerce subscriptions"
        );
        assert_eq!(
            clean_name("Yoast SEO Premium 22.0", ArtifactKind::Plugin),
            "yoast seo"
        );
    }

    #[test]
    fn kind_selects_the_dropped_noun() {
        assert_eq!(clean_name("Astra Pro Theme v4.6.3", ArtifactKind::Theme), "astra");
        assert_eq!(
            clean_name("Astra Pro Theme v4.6.3", ArtifactKind::Plugin),
            "astra theme"
        );
        assert_eq!(
            clean_name("Gravity Forms Plugin 2.8.1", ArtifactKind::Plugin),
            "gravity forms"
        );
    }

    #[test]
    fn words_inside_names_survive() {
        // `\b` keeps "Professional" and "Freedom" intact.
        assert_eq!(
            clean_name("Professional Freedom 1.0", ArtifactKind::Plugin),
            "professional freedom"
        );
    }

    #[test]
    fn separators_and_whitespace_are_cleaned() {
        assert_eq!(clean_name("  : WP  Rocket :  ", ArtifactKind::Plugin), "wp rocket");
        assert_eq!(clean_name("Divi – Elegant Themes", ArtifactKind::Theme), "divi");
        assert_eq!(clean_name("Pro Premium v1.0", ArtifactKind::Plugin), "");
    }
}
