//! Paginated catalog scraping.
//!
//! A [`CatalogSource`] yields one listing page of [`ArtifactRecord`]s at a
//! time; [`scrape_catalog`] walks the pages politely and de-duplicates the
//! result. [`SiteScraper`] is the HTTP-backed source driven by a
//! [`SiteConfig`].

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use scraper::Html;
use tracing::{debug, info, instrument, warn};
use url::Url;

use plugsync_shared::{
    ArtifactKind, ArtifactRecord, CrawlConfig, Origin, PlugsyncError, Result, SiteConfig,
};

use crate::adapters::{ListingAdapter, adapter_for};
use crate::titles::{clean_name, extract_version};

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// A paginated listing of artifacts.
pub trait CatalogSource: Send + Sync {
    /// Short label for logs, e.g. `"plugins@site_a"`.
    fn label(&self) -> String;

    /// Records on 1-based page `page_index`, or `None` once the listing is
    /// exhausted.
    fn fetch_page(
        &self,
        page_index: u32,
    ) -> impl Future<Output = Result<Option<Vec<ArtifactRecord>>>> + Send;
}

/// Progress callbacks for [`scrape_catalog`].
pub trait ScrapeProgress: Send + Sync {
    /// Called after each page that yielded records.
    fn page_scraped(&self, page: u32, max_pages: u32, total_records: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ScrapeProgress for SilentProgress {
    fn page_scraped(&self, _page: u32, _max_pages: u32, _total_records: usize) {}
}

// ---------------------------------------------------------------------------
// scrape_catalog
// ---------------------------------------------------------------------------

/// Walk pages `1..=max_pages` of `source`.
///
/// Stops early when the listing is exhausted. An error on the first page fails
/// the scrape; an error on a later page ends the walk with what was collected.
/// Records are de-duplicated by normalised name, first occurrence wins.
#[instrument(skip_all, fields(source = %source.label(), max_pages = max_pages))]
pub async fn scrape_catalog<S: CatalogSource>(
    source: &S,
    max_pages: u32,
    rate_limit: Duration,
    progress: &dyn ScrapeProgress,
) -> Result<Vec<ArtifactRecord>> {
    let mut records: Vec<ArtifactRecord> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for page in 1..=max_pages {
        if page > 1 && !rate_limit.is_zero() {
            tokio::time::sleep(rate_limit).await;
        }

        let batch = match source.fetch_page(page).await {
            Ok(Some(batch)) => batch,
            Ok(None) => {
                debug!(page, "listing exhausted");
                break;
            }
            Err(e) if page == 1 => return Err(e),
            Err(e) => {
                warn!(page, error = %e, "page failed, keeping earlier pages");
                break;
            }
        };

        let before = records.len();
        for record in batch {
            if seen.insert(record.normalized_name()) {
                records.push(record);
            }
        }
        debug!(page, new = records.len() - before, "page scraped");
        progress.page_scraped(page, max_pages, records.len());
    }

    info!(records = records.len(), "scrape completed");
    Ok(records)
}

// ---------------------------------------------------------------------------
// SiteScraper
// ---------------------------------------------------------------------------

/// HTTP-backed [`CatalogSource`] for one (site, kind) listing.
pub struct SiteScraper {
    client: Client,
    base_url: Url,
    listing_path: String,
    kind: ArtifactKind,
    origin: Origin,
    adapter: Box<dyn ListingAdapter>,
}

impl SiteScraper {
    /// Create a scraper for `kind` on `site`.
    pub fn new(
        site: &SiteConfig,
        kind: ArtifactKind,
        origin: Origin,
        config: &CrawlConfig,
    ) -> Result<Self> {
        let base_url = Url::parse(&site.base_url).map_err(|e| {
            PlugsyncError::config(format!("invalid base URL '{}': {e}", site.base_url))
        })?;

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PlugsyncError::Network(format!("failed to build HTTP client: {e}")))?;

        let mut listing_path = site.listing_path(kind).to_string();
        if !listing_path.ends_with('/') {
            listing_path.push('/');
        }

        Ok(Self {
            client,
            base_url,
            listing_path,
            kind,
            origin,
            adapter: adapter_for(site.layout),
        })
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// URL of 1-based listing page `page_index`.
    pub fn page_url(&self, page_index: u32) -> Result<Url> {
        let path = if page_index <= 1 {
            self.listing_path.clone()
        } else {
            format!("{}page/{page_index}/", self.listing_path)
        };

        self.base_url
            .join(&path)
            .map_err(|e| PlugsyncError::config(format!("invalid listing path '{path}': {e}")))
    }

    /// Turn a listing page into records; `None` when it lists nothing.
    fn parse_listing(&self, body: &str, page_url: &Url) -> Option<Vec<ArtifactRecord>> {
        let doc = Html::parse_document(body);
        let items = self.adapter.extract(&doc, &self.base_url);
        if items.is_empty() {
            return None;
        }

        let found = items.len();
        let records: Vec<ArtifactRecord> = items
            .into_iter()
            .filter_map(|item| {
                let name = clean_name(&item.title, self.kind);
                if name.is_empty() {
                    debug!(title = %item.title, "title has no usable name");
                    return None;
                }
                let version = extract_version(&item.title);
                Some(ArtifactRecord::new(name, version, item.link, self.origin).with_raw_title(item.title))
            })
            .collect();

        debug!(
            url = %page_url,
            adapter = self.adapter.name(),
            found,
            kept = records.len(),
            "listing parsed"
        );
        Some(records)
    }
}

impl CatalogSource for SiteScraper {
    fn label(&self) -> String {
        format!("{}@{}", self.kind.plural(), self.origin)
    }

    async fn fetch_page(&self, page_index: u32) -> Result<Option<Vec<ArtifactRecord>>> {
        let url = self.page_url(page_index)?;
        debug!(%url, page_index, "fetching listing page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| PlugsyncError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(PlugsyncError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PlugsyncError::Network(format!("{url}: body read failed: {e}")))?;

        Ok(self.parse_listing(&body, &url))
    }
}
