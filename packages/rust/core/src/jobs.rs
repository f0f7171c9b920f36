//! Scrape and compare jobs on top of the [`TaskCoordinator`].
//!
//! Four scrape jobs (`scrape-{plugins|themes}-{site_a|site_b}`) fill catalogs;
//! two compare jobs (`compare-{plugins|themes}`) reconcile a site A catalog
//! against the matching site B catalog.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use plugsync_crawler::{CatalogSource, ScrapeProgress, scrape_catalog};
use plugsync_shared::{
    ArtifactKind, ArtifactRecord, ComparisonEntry, ExclusionSet, Origin, OverrideTable,
    PlugsyncError, Result,
};

use crate::coordinator::{ProgressHandle, TaskCoordinator};
use crate::reconcile::{ComparisonSummary, reconcile, unmatched_candidates};

/// Published result of a job.
#[derive(Debug)]
pub enum JobOutput {
    Catalog(Vec<ArtifactRecord>),
    Comparison(ComparisonReport),
}

impl JobOutput {
    pub fn as_catalog(&self) -> Option<&[ArtifactRecord]> {
        match self {
            Self::Catalog(records) => Some(records),
            Self::Comparison(_) => None,
        }
    }

    pub fn as_comparison(&self) -> Option<&ComparisonReport> {
        match self {
            Self::Comparison(report) => Some(report),
            Self::Catalog(_) => None,
        }
    }
}

/// Coordinator type used for scrape and compare jobs.
pub type JobCoordinator = TaskCoordinator<JobOutput>;

pub fn scrape_task_name(kind: ArtifactKind, origin: Origin) -> String {
    format!("scrape-{}-{}", kind.plural(), origin)
}

pub fn compare_task_name(kind: ArtifactKind) -> String {
    format!("compare-{}", kind.plural())
}

// ---------------------------------------------------------------------------
// Scrape
// ---------------------------------------------------------------------------

impl<T: Send + Sync> ScrapeProgress for ProgressHandle<T> {
    fn page_scraped(&self, page: u32, max_pages: u32, total_records: usize) {
        let percent = (u64::from(page) * 100 / u64::from(max_pages.max(1))).min(100) as u8;
        self.report(
            percent,
            format!("page {page}/{max_pages}: {total_records} records"),
        );
    }
}

/// Submit a scrape of `source` under `name`.
pub fn submit_scrape<S>(
    coordinator: &JobCoordinator,
    name: &str,
    source: S,
    max_pages: u32,
    rate_limit: Duration,
) -> Result<()>
where
    S: CatalogSource + 'static,
{
    coordinator.submit(name, move |progress| async move {
        progress.set_message(format!("scraping {}", source.label()));
        let records = scrape_catalog(&source, max_pages, rate_limit, &progress).await?;
        progress.set_message(format!("{} records", records.len()));
        Ok(JobOutput::Catalog(records))
    })
}

// ---------------------------------------------------------------------------
// Compare
// ---------------------------------------------------------------------------

/// Inputs of one compare job. Everything is owned so the job can run on the
/// blocking pool.
#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub kind: ArtifactKind,
    /// Catalog being checked (site A).
    pub subjects: Vec<ArtifactRecord>,
    /// Catalog matched against (site B).
    pub candidates: Vec<ArtifactRecord>,
    pub overrides: OverrideTable,
    pub exclusions: ExclusionSet,
    pub threshold: f64,
}

/// Outcome of reconciling one artifact kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub kind: ArtifactKind,
    pub threshold: f64,
    pub entries: Vec<ComparisonEntry>,
    pub summary: ComparisonSummary,
    /// Candidates no matched entry points at.
    pub unmatched_candidates: Vec<ArtifactRecord>,
}

impl ComparisonReport {
    /// Run the reconciler synchronously.
    pub fn build(request: &CompareRequest) -> Result<Self> {
        let entries = reconcile(
            &request.subjects,
            &request.candidates,
            &request.overrides,
            &request.exclusions,
            request.threshold,
        )?;
        let summary = ComparisonSummary::from_entries(&entries);
        let unmatched_candidates = unmatched_candidates(&entries, &request.candidates);

        Ok(Self {
            kind: request.kind,
            threshold: request.threshold,
            entries,
            summary,
            unmatched_candidates,
        })
    }
}

/// Submit a compare job named after the request's kind.
pub fn submit_compare(coordinator: &JobCoordinator, request: CompareRequest) -> Result<()> {
    let name = compare_task_name(request.kind);

    coordinator.submit(&name, move |progress| async move {
        progress.report(
            5,
            format!(
                "matching {} subjects against {} candidates",
                request.subjects.len(),
                request.candidates.len()
            ),
        );

        let report = tokio::task::spawn_blocking(move || ComparisonReport::build(&request))
            .await
            .map_err(|e| PlugsyncError::WorkerFault(e.to_string()))??;

        info!(
            kind = %report.kind,
            total = report.summary.total,
            matched = report.summary.matched(),
            "comparison built"
        );
        progress.set_message(format!(
            "{} of {} matched",
            report.summary.matched(),
            report.summary.total
        ));
        Ok(JobOutput::Comparison(report))
    })
}
