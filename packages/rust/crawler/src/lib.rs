//! Catalog listing scraper.
//!
//! This crate provides:
//! - [`adapters`]: Layout-specific item extractors (blog articles, WooCommerce products)
//! - [`titles`]: Name and version extraction from listing titles
//! - [`engine`]: Paginated, rate-limited catalog walking

pub mod adapters;
pub mod engine;
pub mod titles;

pub use adapters::{
    ArticleListingAdapter, ListingAdapter, ListingItem, ProductListingAdapter, adapter_for,
};
pub use engine::{CatalogSource, ScrapeProgress, SilentProgress, SiteScraper, scrape_catalog};
pub use titles::{clean_name, extract_version};
