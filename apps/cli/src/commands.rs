//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use tracing::{info, warn};

use plugsync_core::{
    CompareRequest, ComparisonReport, ComparisonSummary, JobCoordinator, JobOutput,
    compare_task_name, invert_overrides, scrape_task_name, submit_compare, submit_scrape,
};
use plugsync_crawler::SiteScraper;
use plugsync_shared::{
    AppConfig, ArtifactKind, ArtifactRecord, ComparisonId, CrawlConfig, Origin, init_config,
    load_config, normalize_name, resolve_path, validate_threshold,
};
use plugsync_storage::Storage;

use crate::progress::watch;
use crate::report::{print_history, print_report};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// plugsync: compare plugin and theme catalogs across two sites.
#[derive(Parser)]
#[command(
    name = "plugsync",
    version,
    about = "Scrape two plugin/theme catalogs and report which items and versions they share.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database file (defaults to `defaults.database` from the config).
    #[arg(long, global = true, env = "PLUGSYNC_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Which artifact kinds a command covers.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum KindSelection {
    Plugins,
    Themes,
    All,
}

impl KindSelection {
    fn kinds(self) -> Vec<ArtifactKind> {
        match self {
            Self::Plugins => vec![ArtifactKind::Plugin],
            Self::Themes => vec![ArtifactKind::Theme],
            Self::All => ArtifactKind::ALL.to_vec(),
        }
    }
}

/// Which sites a scrape covers.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum SiteSelection {
    A,
    B,
    Both,
}

impl SiteSelection {
    fn origins(self) -> Vec<Origin> {
        match self {
            Self::A => vec![Origin::SiteA],
            Self::B => vec![Origin::SiteB],
            Self::Both => Origin::ALL.to_vec(),
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape catalog listings and store the snapshots.
    Scrape {
        #[arg(long, value_enum, default_value = "all")]
        kind: KindSelection,

        #[arg(long, value_enum, default_value = "both")]
        site: SiteSelection,

        /// Listing pages per catalog (defaults to `defaults.max_pages`).
        #[arg(long)]
        pages: Option<u32>,
    },

    /// Reconcile stored snapshots and record the result.
    Compare {
        #[arg(long, value_enum, default_value = "all")]
        kind: KindSelection,

        /// Similarity threshold in [0.80, 1.00] (defaults to `defaults.threshold`).
        #[arg(long)]
        threshold: Option<f64>,

        /// Check site B's catalog against site A instead.
        #[arg(long)]
        reverse: bool,

        /// Print reports as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Scrape everything, then compare both kinds.
    Run {
        #[arg(long)]
        pages: Option<u32>,

        #[arg(long)]
        threshold: Option<f64>,

        #[arg(long)]
        json: bool,
    },

    /// List stored comparison runs, newest first.
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show one stored comparison run.
    Show {
        /// Comparison ID (from `history`).
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Manage forced matches.
    Override {
        #[command(subcommand)]
        action: OverrideAction,
    },

    /// Manage names excluded from matching.
    Exclude {
        #[command(subcommand)]
        action: ExcludeAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Override subcommands.
#[derive(Subcommand)]
pub(crate) enum OverrideAction {
    /// Force `subject` to match `target`.
    Add {
        subject: String,
        target: String,

        #[arg(long, default_value = "plugin")]
        kind: ArtifactKind,

        /// Target version (looked up in the stored snapshot if omitted).
        #[arg(long)]
        version: Option<String>,

        #[arg(long)]
        url: Option<String>,
    },
    /// Remove the override for `subject`.
    Remove {
        subject: String,

        #[arg(long, default_value = "plugin")]
        kind: ArtifactKind,
    },
    /// List overrides.
    List {
        #[arg(long, default_value = "plugin")]
        kind: ArtifactKind,
    },
}

/// Exclusion subcommands.
#[derive(Subcommand)]
pub(crate) enum ExcludeAction {
    /// Exclude `name` from matching.
    Add {
        name: String,

        #[arg(long, default_value = "plugin")]
        kind: ArtifactKind,
    },
    /// Stop excluding `name`.
    Remove {
        name: String,

        #[arg(long, default_value = "plugin")]
        kind: ArtifactKind,
    },
    /// List exclusions.
    List {
        #[arg(long, default_value = "plugin")]
        kind: ArtifactKind,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "plugsync=warn",
        1 => "plugsync=info",
        2 => "plugsync=debug",
        _ => "plugsync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Scrape { kind, site, pages } => {
            let ctx = Context::open(db).await?;
            let failed = ctx.scrape(&kind.kinds(), &site.origins(), pages).await?;
            ctx.finish(failed, "scrape")
        }
        Command::Compare {
            kind,
            threshold,
            reverse,
            json,
        } => {
            let ctx = Context::open(db).await?;
            let failed = ctx.compare(&kind.kinds(), threshold, reverse, json).await?;
            ctx.finish(failed, "compare")
        }
        Command::Run {
            pages,
            threshold,
            json,
        } => {
            let ctx = Context::open(db).await?;
            let mut failed = ctx.scrape(&ArtifactKind::ALL, &Origin::ALL, pages).await?;
            failed += ctx.compare(&ArtifactKind::ALL, threshold, false, json).await?;
            ctx.finish(failed, "run")
        }
        Command::History { limit } => cmd_history(db, limit).await,
        Command::Show { id, json } => cmd_show(db, &id, json).await,
        Command::Override { action } => cmd_override(db, action).await,
        Command::Exclude { action } => cmd_exclude(db, action).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Snapshots older than this get a warning before comparing.
const STALE_AFTER_HOURS: i64 = 24;

fn is_stale(scraped_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - scraped_at > TimeDelta::hours(STALE_AFTER_HOURS)
}

fn database_path(db: Option<PathBuf>, config: &AppConfig) -> Result<PathBuf> {
    match db {
        Some(path) => Ok(path),
        None => Ok(resolve_path(&config.defaults.database)?),
    }
}

// ---------------------------------------------------------------------------
// Scrape / compare
// ---------------------------------------------------------------------------

/// Everything a job-running command needs.
struct Context {
    config: AppConfig,
    storage: Storage,
    coordinator: JobCoordinator,
    poll: Duration,
}

impl Context {
    async fn open(db: Option<PathBuf>) -> Result<Self> {
        let config = load_config()?;
        let path = database_path(db, &config)?;
        let storage = Storage::open(&path).await?;
        let coordinator = JobCoordinator::new(config.defaults.workers);
        let poll = Duration::from_millis(config.defaults.poll_interval_ms);

        info!(db = %path.display(), workers = coordinator.pool_size(), "context ready");
        Ok(Self {
            config,
            storage,
            coordinator,
            poll,
        })
    }

    /// Scrape every (kind, origin) pair concurrently and store finished
    /// catalogs. Returns the number of failed jobs.
    async fn scrape(
        &self,
        kinds: &[ArtifactKind],
        origins: &[Origin],
        pages: Option<u32>,
    ) -> Result<usize> {
        let crawl = CrawlConfig::from(&self.config);
        let max_pages = pages.unwrap_or(crawl.max_pages).max(1);
        let rate_limit = Duration::from_millis(crawl.rate_limit_ms);

        let mut jobs = Vec::new();
        for &kind in kinds {
            for &origin in origins {
                let name = scrape_task_name(kind, origin);
                let scraper = SiteScraper::new(self.config.sites.get(origin), kind, origin, &crawl)?;
                submit_scrape(&self.coordinator, &name, scraper, max_pages, rate_limit)?;
                jobs.push((name, kind, origin));
            }
        }

        let names: Vec<String> = jobs.iter().map(|(name, _, _)| name.clone()).collect();
        let snapshot = watch(&self.coordinator, &names, self.poll).await;

        let mut failed = 0;
        for (name, kind, origin) in &jobs {
            let catalog = snapshot
                .get(name)
                .and_then(|record| record.result.as_deref())
                .and_then(JobOutput::as_catalog);

            match catalog {
                Some(records) => {
                    self.storage.replace_artifacts(*kind, *origin, records).await?;
                    println!("  {name}: {} records stored", records.len());
                }
                None => {
                    failed += 1;
                    let error = snapshot
                        .get(name)
                        .and_then(|record| record.error.clone())
                        .unwrap_or_else(|| "no result".into());
                    warn!(task = %name, %error, "scrape failed, keeping previous snapshot");
                    println!("  {name}: failed ({error})");
                }
            }
        }
        Ok(failed)
    }

    /// Reconcile stored snapshots per kind, store and print the reports.
    /// Returns the number of failed jobs.
    async fn compare(
        &self,
        kinds: &[ArtifactKind],
        threshold: Option<f64>,
        reverse: bool,
        json: bool,
    ) -> Result<usize> {
        let threshold = validate_threshold(threshold.unwrap_or(self.config.defaults.threshold))?;
        let subject_origin = if reverse { Origin::SiteB } else { Origin::SiteA };
        let candidate_origin = subject_origin.counterpart();

        let mut names = Vec::new();
        for &kind in kinds {
            let subjects = self.storage.list_artifacts(kind, subject_origin).await?;
            let candidates = self.storage.list_artifacts(kind, candidate_origin).await?;
            if subjects.is_empty() || candidates.is_empty() {
                warn!(%kind, subjects = subjects.len(), candidates = candidates.len(), "empty snapshot, run `plugsync scrape` first");
            }
            for origin in Origin::ALL {
                self.warn_if_stale(kind, origin).await?;
            }

            // Stored overrides map site A subjects to site B targets.
            let mut overrides = self.storage.load_overrides(kind).await?;
            if reverse {
                overrides = invert_overrides(&overrides, &candidates, candidate_origin);
            }

            let request = CompareRequest {
                kind,
                subjects,
                candidates,
                overrides,
                exclusions: self.storage.load_exclusions(kind).await?,
                threshold,
            };
            submit_compare(&self.coordinator, request)?;
            names.push(compare_task_name(kind));
        }

        let snapshot = watch(&self.coordinator, &names, self.poll).await;

        let mut failed = 0;
        let mut reports = Vec::new();
        for name in &names {
            let record = snapshot.get(name);
            let output = record.and_then(|r| r.result.clone());
            let Some(report) = output.as_deref().and_then(JobOutput::as_comparison) else {
                failed += 1;
                let error = record
                    .and_then(|r| r.error.clone())
                    .unwrap_or_else(|| "no result".into());
                println!("  {name}: failed ({error})");
                continue;
            };

            let id = self
                .storage
                .insert_comparison(
                    report.kind,
                    report.threshold,
                    &report.entries,
                    &report.unmatched_candidates,
                )
                .await?;

            if json {
                reports.push(serde_json::json!({ "id": id.to_string(), "report": report }));
            } else {
                print_report(report, Some(&id));
            }
        }

        if json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Ok(failed)
    }

    async fn warn_if_stale(&self, kind: ArtifactKind, origin: Origin) -> Result<()> {
        if let Some(scraped_at) = self.storage.artifacts_scraped_at(kind, origin).await? {
            if is_stale(scraped_at, Utc::now()) {
                warn!(
                    %kind,
                    %origin,
                    scraped_at = %scraped_at.to_rfc3339(),
                    "snapshot is more than {STALE_AFTER_HOURS}h old, consider re-scraping"
                );
            }
        }
        Ok(())
    }

    fn finish(&self, failed: usize, what: &str) -> Result<()> {
        self.coordinator.shutdown();
        if failed > 0 {
            return Err(eyre!("{what}: {failed} job(s) failed"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

async fn cmd_history(db: Option<PathBuf>, limit: usize) -> Result<()> {
    let config = load_config()?;
    let storage = Storage::open_readonly(&database_path(db, &config)?).await?;
    let headers = storage.list_comparisons(limit).await?;
    print_history(&headers);
    Ok(())
}

async fn cmd_show(db: Option<PathBuf>, id: &str, json: bool) -> Result<()> {
    let id: ComparisonId = id
        .parse()
        .map_err(|e| eyre!("invalid comparison id '{id}': {e}"))?;

    let config = load_config()?;
    let storage = Storage::open_readonly(&database_path(db, &config)?).await?;
    let stored = storage
        .get_comparison(&id)
        .await?
        .ok_or_else(|| eyre!("no comparison with id {id}"))?;

    let report = ComparisonReport {
        kind: stored.header.kind,
        threshold: stored.header.threshold,
        summary: ComparisonSummary::from_entries(&stored.entries),
        entries: stored.entries,
        unmatched_candidates: stored.unmatched_candidates,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, Some(&id));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Overrides / exclusions
// ---------------------------------------------------------------------------

async fn cmd_override(db: Option<PathBuf>, action: OverrideAction) -> Result<()> {
    let config = load_config()?;
    let storage = Storage::open(&database_path(db, &config)?).await?;

    match action {
        OverrideAction::Add {
            subject,
            target,
            kind,
            version,
            url,
        } => {
            let known = storage
                .list_artifacts(kind, Origin::SiteB)
                .await?
                .into_iter()
                .find(|r| r.normalized_name() == normalize_name(&target));

            let record = match known {
                Some(found) => ArtifactRecord::new(
                    found.name,
                    version.unwrap_or(found.version),
                    url.unwrap_or(found.source_url),
                    Origin::SiteB,
                ),
                None => ArtifactRecord::new(
                    target,
                    version.unwrap_or_default(),
                    url.unwrap_or_default(),
                    Origin::SiteB,
                ),
            };

            storage.upsert_override(kind, &subject, &record).await?;
            println!(
                "Override added: {} -> {} {}",
                normalize_name(&subject),
                record.name,
                record.version
            );
        }
        OverrideAction::Remove { subject, kind } => {
            if storage.remove_override(kind, &subject).await? {
                println!("Override removed: {}", normalize_name(&subject));
            } else {
                println!("No override for '{subject}'");
            }
        }
        OverrideAction::List { kind } => {
            let overrides = storage.list_overrides(kind).await?;
            if overrides.is_empty() {
                println!("No {} overrides.", kind);
            }
            for (subject, target) in overrides {
                println!("  {subject} -> {} {}", target.name, target.version);
            }
        }
    }
    Ok(())
}

async fn cmd_exclude(db: Option<PathBuf>, action: ExcludeAction) -> Result<()> {
    let config = load_config()?;
    let storage = Storage::open(&database_path(db, &config)?).await?;

    match action {
        ExcludeAction::Add { name, kind } => {
            if storage.add_exclusion(kind, &name).await? {
                println!("Excluded: {}", normalize_name(&name));
            } else {
                println!("Already excluded: {}", normalize_name(&name));
            }
        }
        ExcludeAction::Remove { name, kind } => {
            if storage.remove_exclusion(kind, &name).await? {
                println!("No longer excluded: {}", normalize_name(&name));
            } else {
                println!("'{name}' was not excluded");
            }
        }
        ExcludeAction::List { kind } => {
            let names = storage.list_exclusions(kind).await?;
            if names.is_empty() {
                println!("No {} exclusions.", kind);
            }
            for name in names {
                println!("  {name}");
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
