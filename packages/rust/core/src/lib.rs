//! Catalog reconciliation and job orchestration for plugsync.
//!
//! This crate provides:
//! - [`version`]: permissive dotted-version comparison
//! - [`matcher`]: name similarity scoring and classification
//! - [`reconcile`]: pairing two catalogs into classified entries
//! - [`coordinator`]: bounded background tasks with observable status
//! - [`jobs`]: scrape and compare jobs wired onto the coordinator

pub mod coordinator;
pub mod jobs;
pub mod matcher;
pub mod reconcile;
pub mod version;

pub use coordinator::{ProgressHandle, TaskCoordinator, TaskRecord, TaskState};
pub use jobs::{
    CompareRequest, ComparisonReport, JobCoordinator, JobOutput, compare_task_name,
    scrape_task_name, submit_compare, submit_scrape,
};
pub use matcher::{BestMatch, DEFAULT_THRESHOLD, NameMatcher, similarity};
pub use reconcile::{ComparisonSummary, invert_overrides, reconcile, unmatched_candidates};
pub use version::{Version, compare_versions};
