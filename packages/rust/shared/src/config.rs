//! Application configuration for plugsync.
//!
//! User config lives at `~/.plugsync/plugsync.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PlugsyncError, Result};
use crate::types::{ArtifactKind, Origin};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "plugsync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".plugsync";

/// Lowest accepted similarity threshold.
pub const MIN_THRESHOLD: f64 = 0.80;

/// Highest accepted similarity threshold.
pub const MAX_THRESHOLD: f64 = 1.00;

// ---------------------------------------------------------------------------
// Config structs (matching plugsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// HTTP politeness settings for scraping.
    #[serde(default)]
    pub crawl: CrawlPoliciesConfig,

    /// The two catalog sites.
    #[serde(default)]
    pub sites: SitesConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Minimum name similarity for a `similar` match.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Number of jobs the coordinator runs at once.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Listing pages walked per scrape.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Database file (`~/` is expanded).
    #[serde(default = "default_database")]
    pub database: String,

    /// How often the CLI polls task status.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            workers: default_workers(),
            max_pages: default_max_pages(),
            database: default_database(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_threshold() -> f64 {
    MIN_THRESHOLD
}
fn default_workers() -> usize {
    4
}
fn default_max_pages() -> u32 {
    5
}
fn default_database() -> String {
    "~/.plugsync/plugsync.db".into()
}
fn default_poll_interval() -> u64 {
    2000
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlPoliciesConfig {
    /// Pause between listing pages of the same site.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,

    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CrawlPoliciesConfig {
    fn default() -> Self {
        Self {
            rate_limit_ms: default_rate_limit(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_rate_limit() -> u64 {
    1000
}
fn default_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    concat!("plugsync/", env!("CARGO_PKG_VERSION")).into()
}

/// HTML layout of a site's listing pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteLayout {
    /// Blog-style `<article>` posts.
    Articles,
    /// WooCommerce product grid.
    Products,
}

/// `[sites.site_a]` / `[sites.site_b]` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Display name.
    pub name: String,
    /// Scheme and host, e.g. `https://weadown.com`.
    pub base_url: String,
    /// Listing path for plugins, with leading and trailing slash.
    pub plugins_path: String,
    /// Listing path for themes, with leading and trailing slash.
    pub themes_path: String,
    pub layout: SiteLayout,
}

impl SiteConfig {
    /// Listing path for the given artifact kind.
    pub fn listing_path(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Plugin => &self.plugins_path,
            ArtifactKind::Theme => &self.themes_path,
        }
    }
}

/// `[sites]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitesConfig {
    #[serde(default = "default_site_a")]
    pub site_a: SiteConfig,
    #[serde(default = "default_site_b")]
    pub site_b: SiteConfig,
}

impl SitesConfig {
    pub fn get(&self, origin: Origin) -> &SiteConfig {
        match origin {
            Origin::SiteA => &self.site_a,
            Origin::SiteB => &self.site_b,
        }
    }
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            site_a: default_site_a(),
            site_b: default_site_b(),
        }
    }
}

fn default_site_a() -> SiteConfig {
    SiteConfig {
        name: "weadown".into(),
        base_url: "https://weadown.com".into(),
        plugins_path: "/wordpress-plugins/".into(),
        themes_path: "/wordpress-theme/".into(),
        layout: SiteLayout::Articles,
    }
}

fn default_site_b() -> SiteConfig {
    SiteConfig {
        name: "plugins-wp".into(),
        base_url: "https://plugins-wp.online".into(),
        plugins_path: "/plugins-wordpress/".into(),
        themes_path: "/temas-wordpress/".into(),
        layout: SiteLayout::Products,
    }
}

impl AppConfig {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.defaults.threshold)?;

        if self.defaults.workers == 0 {
            return Err(PlugsyncError::config("defaults.workers must be at least 1"));
        }

        for origin in Origin::ALL {
            let site = self.sites.get(origin);
            Url::parse(&site.base_url).map_err(|e| {
                PlugsyncError::config(format!(
                    "sites.{origin}.base_url '{}' is not a valid URL: {e}",
                    site.base_url
                ))
            })?;
        }

        Ok(())
    }
}

/// Reject thresholds outside `[MIN_THRESHOLD, MAX_THRESHOLD]` (and NaN).
pub fn validate_threshold(threshold: f64) -> Result<f64> {
    if (MIN_THRESHOLD..=MAX_THRESHOLD).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(PlugsyncError::config(format!(
            "threshold {threshold} is outside [{MIN_THRESHOLD:.2}, {MAX_THRESHOLD:.2}]"
        )))
    }
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime scrape configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Listing pages walked per scrape.
    pub max_pages: u32,
    /// Pause in ms between listing pages.
    pub rate_limit_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// User-Agent header.
    pub user_agent: String,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_pages: config.defaults.max_pages,
            rate_limit_ms: config.crawl.rate_limit_ms,
            timeout_secs: config.crawl.timeout_secs,
            user_agent: config.crawl.user_agent.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.plugsync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PlugsyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.plugsync/plugsync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PlugsyncError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        PlugsyncError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PlugsyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PlugsyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PlugsyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` to the user's home directory.
pub fn resolve_path(raw: &str) -> Result<PathBuf> {
    match raw.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| PlugsyncError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(raw)),
    }
}
