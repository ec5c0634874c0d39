//! Content downloader: book text and cover image bytes, written under sanitized file names.
//!
//! Existing files are overwritten; re-running a crawl downloads everything again.

use crate::site::{FetchError, Fetched, Fetcher, SiteUrls};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Longest file name most filesystems accept, in bytes.
const MAX_FILENAME_BYTES: usize = 255;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Resource does not exist (redirected): {url}")]
    Redirected { url: String },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Download the text of `book_id` to `dest_dir/sanitize(filename)`.
///
/// Returns `Ok(None)` without touching the network when `enabled` is false.
pub fn download_text(
    fetcher: &mut Fetcher,
    urls: &SiteUrls,
    book_id: u64,
    filename: &str,
    dest_dir: &Path,
    enabled: bool,
) -> Result<Option<PathBuf>, DownloadError> {
    ensure_dir(dest_dir)?;
    if !enabled {
        return Ok(None);
    }
    let url = urls.text_endpoint();
    let body = fetch_bytes(fetcher, &url, &[("id", book_id.to_string())])?;
    write_file(dest_dir, filename, &body).map(Some)
}

/// Download the cover at `cover_url` to `dest_dir/sanitize(filename)`.
///
/// Returns `Ok(None)` without touching the network when `enabled` is false.
pub fn download_cover(
    fetcher: &mut Fetcher,
    cover_url: &Url,
    filename: &str,
    dest_dir: &Path,
    enabled: bool,
) -> Result<Option<PathBuf>, DownloadError> {
    ensure_dir(dest_dir)?;
    if !enabled {
        return Ok(None);
    }
    let body = fetch_bytes(fetcher, cover_url.as_str(), &[])?;
    write_file(dest_dir, filename, &body).map(Some)
}

/// File name for a cover: the last path segment of its URL.
pub fn cover_filename(cover_url: &Url) -> String {
    cover_url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("cover")
        .to_string()
}

/// File name for a book text: `"{id}. {title}"`.
pub fn text_filename(book_id: u64, title: &str) -> String {
    format!("{}. {}", book_id, title)
}

/// Make `name` safe to use as a single file name.
///
/// Drops path separators, characters reserved on Windows and control characters, trims
/// trailing dots and spaces, and caps the length. Falls back to `_` if nothing usable is left.
pub fn sanitize_filename(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect();

    sanitized = sanitized.trim_start().to_string();

    let mut end = sanitized.len().min(MAX_FILENAME_BYTES);
    while !sanitized.is_char_boundary(end) {
        end -= 1;
    }
    sanitized.truncate(end);
    // Trailing dots and spaces are trimmed after the cap, which can expose new ones.
    let sanitized = sanitized.trim_end_matches(&['.', ' '][..]);

    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        "_".to_string()
    } else {
        sanitized.to_string()
    }
}

fn ensure_dir(dir: &Path) -> Result<(), DownloadError> {
    std::fs::create_dir_all(dir).map_err(|e| DownloadError::Io {
        path: dir.to_path_buf(),
        source: e,
    })
}

fn fetch_bytes(
    fetcher: &mut Fetcher,
    url: &str,
    query: &[(&str, String)],
) -> Result<Vec<u8>, DownloadError> {
    match fetcher.fetch(url, query)? {
        Fetched::Page(response) => Ok(response.body),
        Fetched::Redirected { url, .. } => Err(DownloadError::Redirected { url }),
    }
}

fn write_file(dest_dir: &Path, filename: &str, body: &[u8]) -> Result<PathBuf, DownloadError> {
    let path = dest_dir.join(sanitize_filename(filename));
    std::fs::write(&path, body).map_err(|e| DownloadError::Io {
        path: path.clone(),
        source: e,
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_filename_cap_never_ends_in_space_or_dot() {
        let name = format!("{} b", "a".repeat(254));
        let sanitized = sanitize_filename(&name);
        assert_eq!(sanitized, "a".repeat(254));

        let dotted = format!("{}.txt", "a".repeat(254));
        assert_eq!(sanitize_filename(&dotted), "a".repeat(254));
    }

    #[test]
    fn sanitize_filename_strips_reserved_characters() {
        assert_eq!(sanitize_filename("7. Dune"), "7. Dune");
        assert_eq!(sanitize_filename("1. Who? What: Why/How"), "1. Who What WhyHow");
        assert_eq!(sanitize_filename("a<b>c|d\"e*f\\g"), "abcdefg");
        assert_eq!(sanitize_filename("tab\there"), "tabhere");
    }

    #[test]
    fn sanitize_filename_trims_trailing_dots_and_spaces() {
        assert_eq!(sanitize_filename("12. Конец...  "), "12. Конец");
        assert_eq!(sanitize_filename("  leading"), "leading");
    }

    #[test]
    fn sanitize_filename_falls_back_when_empty() {
        assert_eq!(sanitize_filename(""), "_");
        assert_eq!(sanitize_filename("///"), "_");
        assert_eq!(sanitize_filename(".."), "_");
        assert_eq!(sanitize_filename("."), "_");
    }

    #[test]
    fn sanitize_filename_caps_length_on_char_boundary() {
        let long = "ж".repeat(200);
        let out = sanitize_filename(&long);
        assert!(out.len() <= MAX_FILENAME_BYTES);
        assert!(out.chars().all(|c| c == 'ж'));
    }

    #[test]
    fn cover_filename_is_last_segment() {
        let url = Url::parse("https://tululu.org/shots/239.jpg").unwrap();
        assert_eq!(cover_filename(&url), "239.jpg");
        let bare = Url::parse("https://tululu.org/").unwrap();
        assert_eq!(cover_filename(&bare), "cover");
    }

    #[test]
    fn text_filename_joins_id_and_title() {
        assert_eq!(text_filename(7, "Dune"), "7. Dune");
    }

    #[test]
    fn disabled_downloads_create_dir_and_skip_network() {
        let tmp = tempfile::tempdir().unwrap();
        let mut fetcher = Fetcher::new().unwrap();
        // Unroutable base: any network call would fail the test.
        let urls = SiteUrls::new("http://127.0.0.1:1/").unwrap();
        let books = tmp.path().join("Books");
        let images = tmp.path().join("Images");

        let text = download_text(&mut fetcher, &urls, 7, "7. Dune", &books, false).unwrap();
        let cover_url = Url::parse("http://127.0.0.1:1/shots/7.jpg").unwrap();
        let cover = download_cover(&mut fetcher, &cover_url, "7.jpg", &images, false).unwrap();

        assert!(text.is_none());
        assert!(cover.is_none());
        assert!(books.is_dir());
        assert!(images.is_dir());
    }
}
