//! Plain-text rendering of comparison reports and history.

use plugsync_core::ComparisonReport;
use plugsync_shared::{ComparisonEntry, ComparisonId, MatchClassification};
use plugsync_storage::ComparisonHeader;

pub(crate) fn print_report(report: &ComparisonReport, id: Option<&ComparisonId>) {
    let summary = &report.summary;

    println!();
    match id {
        Some(id) => println!("  {} comparison {id}", report.kind),
        None => println!("  {} comparison", report.kind),
    }
    println!("  Threshold: {:.2}", report.threshold);
    println!(
        "  Subjects:  {} ({} exact, {} similar, {} manual, {} unmatched, {} excluded)",
        summary.total,
        summary.exact,
        summary.similar,
        summary.manual,
        summary.unmatched,
        summary.blacklisted
    );
    println!(
        "  Versions:  {} older, {} same, {} newer, {} unknown",
        summary.older, summary.same, summary.newer, summary.unknown_version
    );
    println!();

    if !report.entries.is_empty() {
        println!(
            "  {:<11} {:<32} {:<12} {:<32} {:<12} {:>5}  {}",
            "CLASS", "SUBJECT", "VERSION", "MATCH", "VERSION", "SIM", "RELATION"
        );
        for entry in &report.entries {
            print_entry(entry);
        }
        println!();
    }

    if !report.unmatched_candidates.is_empty() {
        println!(
            "  Only on the other site ({}):",
            report.unmatched_candidates.len()
        );
        for candidate in &report.unmatched_candidates {
            println!("    {} {}", candidate.name, candidate.version);
        }
        println!();
    }
}

fn print_entry(entry: &ComparisonEntry) {
    let (match_name, match_version) = match &entry.matched {
        Some(m) => (m.name.as_str(), m.version.as_str()),
        None => ("-", "-"),
    };
    let similarity = entry
        .similarity
        .map(|s| format!("{:.0}%", s * 100.0))
        .unwrap_or_else(|| "-".into());
    let relation = if entry.classification.is_matched() {
        entry.version_relation.as_str()
    } else {
        "-"
    };

    println!(
        "  {:<11} {:<32} {:<12} {:<32} {:<12} {:>5}  {}",
        label(entry.classification),
        truncate(&entry.subject.name, 32),
        truncate(&entry.subject.version, 12),
        truncate(match_name, 32),
        truncate(match_version, 12),
        similarity,
        relation
    );
}

fn label(classification: MatchClassification) -> &'static str {
    match classification {
        MatchClassification::Blacklisted => "excluded",
        other => other.as_str(),
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

pub(crate) fn print_history(headers: &[ComparisonHeader]) {
    if headers.is_empty() {
        println!("No comparisons stored yet.");
        return;
    }

    println!(
        "  {:<36}  {:<7}  {:<20}  {:>9}  {:>7}",
        "ID", "KIND", "CREATED", "THRESHOLD", "MATCHED"
    );
    for header in headers {
        println!(
            "  {:<36}  {:<7}  {:<20}  {:>9.2}  {:>3}/{:<3}",
            header.id,
            header.kind,
            header.created_at.format("%Y-%m-%d %H:%M:%S"),
            header.threshold,
            header.matched,
            header.total
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_names() {
        assert_eq!(truncate("akismet", 10), "akismet");
        assert_eq!(truncate("woocommerce subscriptions", 10), "woocommer…");
    }

    #[test]
    fn excluded_label() {
        assert_eq!(label(MatchClassification::Blacklisted), "excluded");
        assert_eq!(label(MatchClassification::Similar), "similar");
    }
}
