//! Book detail page parser.

use super::error::ParseError;
use super::{parse_selector, RawResponse};
use crate::model::BookRecord;
use scraper::{ElementRef, Html};
use url::Url;

/// Separator between book title and author in the page heading.
const TITLE_AUTHOR_SEPARATOR: &str = "::";

/// Parse a fetched book page. Relative cover links are resolved against the response URL.
pub fn parse(page: &RawResponse) -> Result<BookRecord, ParseError> {
    parse_book_page(&page.text(), &page.url)
}

/// Parse book page HTML. Fails when the title heading or the cover image is missing.
pub fn parse_book_page(html: &str, page_url: &Url) -> Result<BookRecord, ParseError> {
    let doc = Html::parse_document(html);
    let malformed = |message: &str| ParseError::BookPage {
        url: page_url.to_string(),
        message: message.to_string(),
    };

    let h1_sel = parse_selector("h1")?;
    let heading = doc
        .select(&h1_sel)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed("missing title heading"))?;
    let (title, author) = split_title_author(&heading);
    if title.is_empty() {
        return Err(malformed("empty book title"));
    }

    let cover_sel = parse_selector("div.bookimage img[src]")?;
    let cover_src = doc
        .select(&cover_sel)
        .next()
        .and_then(|img| img.value().attr("src"))
        .ok_or_else(|| malformed("missing cover image"))?;
    let cover_url = page_url
        .join(cover_src.trim())
        .map_err(|e| malformed(&format!("invalid cover URL {:?}: {}", cover_src, e)))?;

    let comment_sel = parse_selector("div.texts span")?;
    let comments = doc
        .select(&comment_sel)
        .map(element_text)
        .filter(|s| !s.is_empty())
        .collect();

    let genre_sel = parse_selector("span.d_book a")?;
    let mut genres: Vec<String> = Vec::new();
    for genre in doc.select(&genre_sel).map(element_text) {
        if !genre.is_empty() && !genres.contains(&genre) {
            genres.push(genre);
        }
    }

    Ok(BookRecord {
        title,
        author,
        cover_url,
        comments,
        genres,
    })
}

/// Split `"Title :: Author"` on the first separator. Without a separator the whole text is the title.
pub fn split_title_author(heading: &str) -> (String, String) {
    match heading.split_once(TITLE_AUTHOR_SEPARATOR) {
        Some((title, author)) => (title.trim().to_string(), author.trim().to_string()),
        None => (heading.trim().to_string(), String::new()),
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}
