//! Blog-style listings: one `<article>` per download post.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{ListingAdapter, ListingItem, element_text, resolve_link};

static ITEM_SELECTORS: LazyLock<[Selector; 3]> = LazyLock::new(|| {
    [
        Selector::parse(r#"article[class*="post"]"#).expect("valid selector"),
        Selector::parse("div.post-item").expect("valid selector"),
        Selector::parse("article").expect("valid selector"),
    ]
});

static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"h2[class*="title"], h3[class*="title"], h4[class*="title"]"#)
        .expect("valid selector")
});

static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3, h4").expect("valid selector"));

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid selector"));

static HREF_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Post permalinks carry a `/YYYY/` segment.
static PERMALINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\d{4}/").expect("valid regex"));

/// Handles WordPress blog listings (`article.post`, `div.post-item`).
pub struct ArticleListingAdapter;

impl ListingAdapter for ArticleListingAdapter {
    fn extract(&self, doc: &Html, base_url: &Url) -> Vec<ListingItem> {
        // First selector that finds anything wins.
        let items: Vec<ElementRef<'_>> = ITEM_SELECTORS
            .iter()
            .map(|sel| doc.select(sel).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default();

        items
            .iter()
            .filter_map(|item| {
                let heading = item
                    .select(&TITLE_SEL)
                    .next()
                    .or_else(|| item.select(&HEADING_SEL).next())?;

                let title = element_text(&heading);
                if title.is_empty() {
                    return None;
                }

                Some(ListingItem {
                    title,
                    link: post_link(item, &heading, base_url),
                })
            })
            .collect()
    }

    fn name(&self) -> &str {
        "articles"
    }
}

/// The heading's own anchor, else the first permalink-looking anchor.
fn post_link(item: &ElementRef<'_>, heading: &ElementRef<'_>, base_url: &Url) -> String {
    if let Some(anchor) = heading.select(&ANCHOR_SEL).next() {
        return anchor
            .value()
            .attr("href")
            .map(|href| resolve_link(base_url, href))
            .unwrap_or_default();
    }

    item.select(&HREF_SEL)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| PERMALINK_RE.is_match(href))
        .map(|href| resolve_link(base_url, href))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> Vec<ListingItem> {
        let doc = Html::parse_document(html);
        let base = Url::parse("https://weadown.com").unwrap();
        ArticleListingAdapter.extract(&doc, &base)
    }

    #[test]
    fn extracts_post_articles() {
        let items = extract(
            r#"<html><body>
            <article class="post type-post">
              <h2 class="entry-title"><a href="/2024/01/elementor-pro/">Elementor Pro v3.18.1</a></h2>
            </article>
            <article class="post">
              <h3 class="post-title"><a href="https://weadown.com/2024/02/wp-rocket/">WP Rocket 3.15</a></h3>
            </article>
            </body></html>"#,
        );

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Elementor Pro v3.18.1");
        assert_eq!(items[0].link, "https://weadown.com/2024/01/elementor-pro/");
        assert_eq!(items[1].title, "WP Rocket 3.15");
    }

    #[test]
    fn falls_back_to_post_item_divs() {
        let items = extract(
            r#"<html><body>
            <div class="post-item"><h4>Akismet 5.3</h4><a href="/category/x/">cat</a><a href="/2023/11/akismet/">more</a></div>
            </body></html>"#,
        );

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Akismet 5.3");
        assert_eq!(items[0].link, "https://weadown.com/2023/11/akismet/");
    }

    #[test]
    fn prefers_title_classed_heading() {
        let items = extract(
            r#"<html><body>
            <article class="post">
              <h3>Related downloads</h3>
              <h2 class="entry-title">Jetpack 13.1</h2>
            </article>
            </body></html>"#,
        );

        assert_eq!(items[0].title, "Jetpack 13.1");
        assert_eq!(items[0].link, "");
    }

    #[test]
    fn skips_articles_without_headings() {
        let items = extract(
            r#"<html><body>
            <article class="post"><p>advert</p></article>
            <article class="post"><h2 class="entry-title">Rank Math 1.0.2</h2></article>
            </body></html>"#,
        );
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn empty_page_has_no_items() {
        assert!(extract("<html><body><p>Nothing found</p></body></html>").is_empty());
    }
}
