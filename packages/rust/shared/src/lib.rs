//! Shared types, error model, and configuration for plugsync.
//!
//! This crate is the foundation depended on by all other plugsync crates.
//! It provides:
//! - [`PlugsyncError`]: the unified error type
//! - Domain types ([`ArtifactRecord`], [`ComparisonEntry`], [`OverrideTable`], [`ExclusionSet`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, CrawlPoliciesConfig, DefaultsConfig, MAX_THRESHOLD, MIN_THRESHOLD,
    SiteConfig, SiteLayout, SitesConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, resolve_path, validate_threshold,
};
pub use error::{PlugsyncError, Result};
pub use types::{
    ArtifactKind, ArtifactRecord, ComparisonEntry, ComparisonId, ExclusionSet,
    MatchClassification, Origin, OverrideTable, VersionRelation, normalize_name,
};
