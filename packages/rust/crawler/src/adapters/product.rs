//! WooCommerce product grids.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{ListingAdapter, ListingItem, element_text, resolve_link};

static ITEM_SELECTORS: LazyLock<[Selector; 2]> = LazyLock::new(|| {
    [
        Selector::parse(r#"li[class*="product"]"#).expect("valid selector"),
        Selector::parse(r#"div[class*="product"]"#).expect("valid selector"),
    ]
});

static TITLE_SELECTORS: LazyLock<[Selector; 3]> = LazyLock::new(|| {
    [
        Selector::parse("h2.woocommerce-loop-product__title").expect("valid selector"),
        Selector::parse(r#"h2[class*="product"], h3[class*="product"]"#).expect("valid selector"),
        Selector::parse("h2, h3").expect("valid selector"),
    ]
});

static HREF_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Handles WooCommerce shop listings (`li.product`).
pub struct ProductListingAdapter;

impl ListingAdapter for ProductListingAdapter {
    fn extract(&self, doc: &Html, base_url: &Url) -> Vec<ListingItem> {
        let items: Vec<ElementRef<'_>> = ITEM_SELECTORS
            .iter()
            .map(|sel| doc.select(sel).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default();

        items
            .iter()
            .filter_map(|item| {
                let heading = TITLE_SELECTORS
                    .iter()
                    .find_map(|sel| item.select(sel).next())?;

                let title = element_text(&heading);
                if title.is_empty() {
                    return None;
                }

                let link = item
                    .select(&HREF_SEL)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .map(|href| resolve_link(base_url, href))
                    .unwrap_or_default();

                Some(ListingItem { title, link })
            })
            .collect()
    }

    fn name(&self) -> &str {
        "products"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> Vec<ListingItem> {
        let doc = Html::parse_document(html);
        let base = Url::parse("https://plugins-wp.online").unwrap();
        ProductListingAdapter.extract(&doc, &base)
    }

    #[test]
    fn extracts_woocommerce_products() {
        let items = extract(
            r#"<html><body><ul class="products">
            <li class="product type-product">
              <a href="/producto/elementor-pro/"><h2 class="woocommerce-loop-product__title">Elementor Pro 3.18.3</h2></a>
            </li>
            <li class="product">
              <a href="https://plugins-wp.online/producto/woocommerce/"><h2 class="woocommerce-loop-product__title">WooCommerce 8.6.0</h2></a>
            </li>
            </ul></body></html>"#,
        );

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Elementor Pro 3.18.3");
        assert_eq!(items[0].link, "https://plugins-wp.online/producto/elementor-pro/");
        assert_eq!(items[1].link, "https://plugins-wp.online/producto/woocommerce/");
    }

    #[test]
    fn falls_back_to_product_divs_and_plain_headings() {
        let items = extract(
            r#"<html><body>
            <div class="product-card"><h3>Astra Pro 4.6.3</h3></div>
            </body></html>"#,
        );

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Astra Pro 4.6.3");
        assert_eq!(items[0].link, "");
    }

    #[test]
    fn product_classed_heading_beats_plain_heading() {
        let items = extract(
            r#"<html><body><ul>
            <li class="product"><h2>Sale!</h2><h3 class="product-name">Divi 4.24</h3></li>
            </ul></body></html>"#,
        );
        assert_eq!(items[0].title, "Divi 4.24");
    }

    #[test]
    fn page_without_products_is_empty() {
        assert!(extract("<html><body><h1>No products were found</h1></body></html>").is_empty());
    }
}
