//! Data passed between the pipeline stages.
//!
//! Only [`ManifestEntry`] is serialized; its field names are the manifest file format.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// One category and the inclusive range of catalog pages to walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRef {
    pub site_base: Url,
    pub category_slug: String,
    pub first_page: u32,
    pub last_page: u32,
}

impl CategoryRef {
    /// Build a category reference. Pages are 1-based and `first_page <= last_page`.
    pub fn new(
        site_base: Url,
        category_slug: impl Into<String>,
        first_page: u32,
        last_page: u32,
    ) -> Result<Self, String> {
        let category_slug = category_slug.into();
        if site_base.cannot_be_a_base() {
            return Err(format!("site base {} cannot be used as a base URL", site_base));
        }
        if category_slug.trim().is_empty() {
            return Err("category must not be empty".to_string());
        }
        if first_page < 1 {
            return Err(format!("first page must be >= 1, got {}", first_page));
        }
        if first_page > last_page {
            return Err(format!(
                "first page ({}) must be <= last page ({})",
                first_page, last_page
            ));
        }
        Ok(Self {
            site_base,
            category_slug,
            first_page,
            last_page,
        })
    }

    pub fn pages(&self) -> std::ops::RangeInclusive<u32> {
        self.first_page..=self.last_page
    }

    pub fn page_count(&self) -> u32 {
        self.last_page - self.first_page + 1
    }
}

/// Book detail-page link found on a catalog page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookLink {
    pub book_id: u64,
}

/// Metadata parsed from one book detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub title: String,
    pub author: String,
    pub cover_url: Url,
    pub comments: Vec<String>,
    /// Page order, duplicates removed.
    pub genres: Vec<String>,
}

/// Where the downloader stored a book's files. `None` when that download was disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadResult {
    pub text_path: Option<PathBuf>,
    pub cover_path: Option<PathBuf>,
}

/// One manifest object. `img_src` is null when cover downloads were disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub title: String,
    pub author: String,
    pub img_src: Option<PathBuf>,
    pub book_path: PathBuf,
    pub comments: Vec<String>,
    pub genres: Vec<String>,
}

impl ManifestEntry {
    /// Combine a parsed record with its downloads. Returns `None` unless a text file was stored.
    pub fn from_parts(record: &BookRecord, downloads: &DownloadResult) -> Option<Self> {
        let book_path = downloads.text_path.clone()?;
        Some(Self {
            title: record.title.clone(),
            author: record.author.clone(),
            img_src: downloads.cover_path.clone(),
            book_path,
            comments: record.comments.clone(),
            genres: record.genres.clone(),
        })
    }
}
