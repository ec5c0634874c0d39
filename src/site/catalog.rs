//! Catalog paginator. Walks the page range of one category and collects book ids in catalog order.
//!
//! A page that fails to load is logged and skipped; a page that redirects (past the last page)
//! counts as empty.

use super::error::ParseError;
use super::{parse_selector, Fetched, Fetcher, SiteUrls};
use crate::model::{BookLink, CategoryRef};
use scraper::Html;
use url::Url;

/// Result of walking a category: the links found and how many pages were requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogListing {
    pub links: Vec<BookLink>,
    pub pages_requested: u32,
    pub pages_failed: u32,
}

/// Fetch every page in `category.pages()` on the category's own site and append each row's
/// book id, preserving order.
pub fn list_books(
    fetcher: &mut Fetcher,
    category: &CategoryRef,
) -> Result<CatalogListing, ParseError> {
    let urls = SiteUrls::from(&category.site_base);
    let mut listing = CatalogListing::default();
    for page in category.pages() {
        let page_url = urls.category_page(&category.category_slug, page);
        listing.pages_requested += 1;
        let response = match fetcher.fetch(&page_url, &[]) {
            Ok(Fetched::Page(r)) => r,
            Ok(Fetched::Redirected { location, .. }) => {
                tracing::debug!(
                    page,
                    url = %page_url,
                    location = location.as_deref().unwrap_or(""),
                    "catalog page redirected, treating as empty"
                );
                continue;
            }
            Err(e) => {
                tracing::warn!(page, "skipping catalog page: {}", e);
                listing.pages_failed += 1;
                continue;
            }
        };
        let found = parse_catalog_page(&response.text(), &response.url)?;
        tracing::info!(page, books = found.len(), "catalog page parsed");
        listing.links.extend(found);
    }
    Ok(listing)
}

/// Extract book links from one catalog page. Each `table.d_book` row contributes the first
/// anchor whose resolved path ends in a `b<digits>` segment; rows without one are ignored.
pub fn parse_catalog_page(html: &str, page_url: &Url) -> Result<Vec<BookLink>, ParseError> {
    let doc = Html::parse_document(html);
    let row_sel = parse_selector("table.d_book")?;
    let anchor_sel = parse_selector("a[href]")?;
    let links = doc
        .select(&row_sel)
        .filter_map(|row| {
            row.select(&anchor_sel)
                .filter_map(|a| a.value().attr("href"))
                .filter_map(|href| page_url.join(href).ok())
                .find_map(|url| book_id_from_url(&url))
        })
        .map(|book_id| BookLink { book_id })
        .collect();
    Ok(links)
}

/// `https://site/b239/` -> 239. Only the last non-empty path segment is considered.
pub fn book_id_from_url(url: &Url) -> Option<u64> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let digits = segment.strip_prefix('b')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|id| *id > 0)
}
