//! Everything that knows the catalog site: endpoints, the fetcher, and page parsers.

mod client;
mod error;

pub mod book_page;
pub mod catalog;

pub use client::{Fetched, Fetcher, FetcherBuilder, RawResponse};
pub use error::{FetchError, ParseError};

use scraper::Selector;
use url::Url;

pub const DEFAULT_SITE_BASE: &str = "https://tululu.org/";

/// Parse a CSS selector or return a parse error (avoids panics from Selector::parse).
pub(crate) fn parse_selector(sel: &str) -> Result<Selector, ParseError> {
    Selector::parse(sel).map_err(|e| ParseError::Selector {
        selector: sel.to_string(),
        reason: e.to_string(),
    })
}

/// Endpoint builder for one site base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrls {
    base: Url,
}

impl SiteUrls {
    /// `base` gets a trailing slash so that joins append instead of replacing the last segment.
    pub fn new(base: &str) -> Result<Self, FetchError> {
        let mut normalized = base.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base = Url::parse(&normalized).map_err(|e| FetchError::InvalidUrl {
            input: base.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl {
                input: base.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `{base}{category}/{page}/`
    pub fn category_page(&self, category: &str, page: u32) -> String {
        format!("{}{}/{}/", self.base, category.trim_matches('/'), page)
    }

    /// `{base}b{id}/`
    pub fn book_page(&self, book_id: u64) -> String {
        format!("{}b{}/", self.base, book_id)
    }

    /// Text endpoint; the book id goes in the `id` query parameter.
    pub fn text_endpoint(&self) -> String {
        format!("{}txt.php", self.base)
    }
}

impl From<&Url> for SiteUrls {
    /// Endpoints rooted at an already-parsed base; a missing trailing slash is added.
    fn from(base: &Url) -> Self {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base }
    }
}

/// Accept a bare slug (`l55`) or a full category URL (`https://tululu.org/l55/`) and return the slug.
pub fn category_slug(input: &str) -> Option<String> {
    let input = input.trim();
    let path = match Url::parse(input) {
        Ok(url) => url.path().to_string(),
        Err(_) => input.to_string(),
    };
    path.split('/')
        .filter(|s| !s.is_empty())
        .last()
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_urls_build_endpoints() {
        let urls = SiteUrls::new("https://tululu.org").unwrap();
        assert_eq!(urls.category_page("l55", 3), "https://tululu.org/l55/3/");
        assert_eq!(urls.book_page(239), "https://tululu.org/b239/");
        assert_eq!(urls.text_endpoint(), "https://tululu.org/txt.php");
    }

    #[test]
    fn site_urls_keep_base_path() {
        let urls = SiteUrls::new("http://127.0.0.1:8080/mirror/").unwrap();
        assert_eq!(urls.book_page(7), "http://127.0.0.1:8080/mirror/b7/");
    }

    #[test]
    fn site_urls_from_parsed_base_adds_trailing_slash() {
        let base = Url::parse("http://127.0.0.1:8080/mirror").unwrap();
        let urls = SiteUrls::from(&base);
        assert_eq!(urls.category_page("l55", 1), "http://127.0.0.1:8080/mirror/l55/1/");
        assert_eq!(SiteUrls::from(urls.base()), urls);
    }

    #[test]
    fn site_urls_reject_garbage() {
        assert!(SiteUrls::new("not a url").is_err());
        assert!(SiteUrls::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn default_site_base_is_valid() {
        let urls = SiteUrls::new(DEFAULT_SITE_BASE).unwrap();
        assert_eq!(urls.base().as_str(), DEFAULT_SITE_BASE);
    }

    #[test]
    fn category_slug_from_url_or_slug() {
        assert_eq!(category_slug("https://tululu.org/l55/").as_deref(), Some("l55"));
        assert_eq!(category_slug("l55").as_deref(), Some("l55"));
        assert_eq!(category_slug("/l55/").as_deref(), Some("l55"));
        assert_eq!(category_slug("https://tululu.org/"), None);
        assert_eq!(category_slug(""), None);
    }
}
