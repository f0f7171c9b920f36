//! Listing layout adapters.
//!
//! Each adapter knows how one family of catalog pages lays out its items and
//! pulls out `(title, link)` pairs. Turning titles into names and versions is
//! left to [`crate::titles`].

mod article;
mod product;

use scraper::{ElementRef, Html};
use url::Url;

use plugsync_shared::SiteLayout;

pub use article::ArticleListingAdapter;
pub use product::ProductListingAdapter;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One item found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    /// Item title as displayed, whitespace-collapsed.
    pub title: String,
    /// Absolute link to the item page, or empty if none was found.
    pub link: String,
}

/// Extracts listing items from a parsed catalog page.
pub trait ListingAdapter: Send + Sync {
    /// All items on the page, in document order. Items without a title are
    /// skipped.
    fn extract(&self, doc: &Html, base_url: &Url) -> Vec<ListingItem>;

    /// Human-readable adapter name for tracing.
    fn name(&self) -> &str;
}

/// The adapter for a configured site layout.
pub fn adapter_for(layout: SiteLayout) -> Box<dyn ListingAdapter> {
    match layout {
        SiteLayout::Articles => Box::new(ArticleListingAdapter),
        SiteLayout::Products => Box::new(ProductListingAdapter),
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Element text with whitespace collapsed.
fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve `href` against the site base URL.
fn resolve_link(base_url: &Url, href: &str) -> String {
    base_url
        .join(href)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}
