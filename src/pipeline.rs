//! End-to-end crawl: catalog pages -> book ids -> per-book acquisition under the retry policy ->
//! manifest. Books are acquired sequentially by default; with more than one worker a bounded
//! pool is used and results are re-ordered by catalog position before they reach the manifest.

use crate::download::{self, cover_filename, text_filename};
use crate::manifest::{Manifest, ManifestError};
use crate::model::{BookLink, BookRecord, CategoryRef, DownloadResult, ManifestEntry};
use crate::retry::{run_with_retry, AcquireError, BookOutcome, RetryPolicy};
use crate::site::catalog::{self, CatalogListing};
use crate::site::{book_page, Fetched, Fetcher, ParseError, SiteUrls};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;
use thiserror::Error;

pub const BOOKS_DIR: &str = "Books";
pub const IMAGES_DIR: &str = "Images";

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Where a run writes its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub books_dir: PathBuf,
    pub images_dir: PathBuf,
    pub manifest_path: PathBuf,
}

impl OutputLayout {
    /// `{download_folder}/Books`, `{download_folder}/Images`, `{download_folder}/{manifest_name}`.
    pub fn new(download_folder: &Path, manifest_name: &Path) -> Self {
        Self {
            books_dir: download_folder.join(BOOKS_DIR),
            images_dir: download_folder.join(IMAGES_DIR),
            manifest_path: download_folder.join(manifest_name),
        }
    }
}

/// Options for a crawl run.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub layout: OutputLayout,
    pub skip_text: bool,
    pub skip_img: bool,
    pub retry: RetryPolicy,
    /// Books acquired in parallel. 1 keeps the run strictly sequential.
    pub workers: usize,
}

/// Callbacks a run reports through. `sleep` is the backoff between retries.
pub struct RunHooks<'a> {
    pub sleep: &'a (dyn Fn(Duration) + Sync),
    /// Called with (books finished, books total) after each book.
    pub progress: Option<&'a (dyn Fn(u32, u32) + Sync)>,
}

impl Default for RunHooks<'_> {
    fn default() -> Self {
        Self {
            sleep: &std::thread::sleep,
            progress: None,
        }
    }
}

/// Counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_requested: u32,
    pub pages_failed: u32,
    pub discovered: usize,
    pub recorded: usize,
    /// Succeeded, but no text file to record (text disabled).
    pub not_recorded: usize,
    pub skipped: usize,
    pub given_up: usize,
    pub manifest_path: PathBuf,
}

/// A book whose page was parsed and whose enabled downloads completed.
#[derive(Debug, Clone)]
pub struct Acquired {
    pub book_id: u64,
    pub record: BookRecord,
    pub downloads: DownloadResult,
}

/// Walk the catalog and return unique book links in catalog order (first occurrence wins).
pub fn discover(
    fetcher: &mut Fetcher,
    category: &CategoryRef,
) -> Result<CatalogListing, ParseError> {
    let mut listing = catalog::list_books(fetcher, category)?;
    let mut seen = HashSet::new();
    listing.links.retain(|link| seen.insert(link.book_id));
    Ok(listing)
}

/// One attempt at a book: fetch and parse its page, then download text and cover.
pub fn acquire_once(
    fetcher: &mut Fetcher,
    urls: &SiteUrls,
    book_id: u64,
    options: &CrawlOptions,
) -> Result<Acquired, AcquireError> {
    let page_url = urls.book_page(book_id);
    let page = match fetcher.fetch(&page_url, &[])? {
        Fetched::Page(page) => page,
        Fetched::Redirected { url, .. } => return Err(AcquireError::Redirected { url }),
    };
    let record = book_page::parse(&page)?;

    let text_path = download::download_text(
        fetcher,
        urls,
        book_id,
        &text_filename(book_id, &record.title),
        &options.layout.books_dir,
        !options.skip_text,
    )?;
    let cover_path = download::download_cover(
        fetcher,
        &record.cover_url,
        &cover_filename(&record.cover_url),
        &options.layout.images_dir,
        !options.skip_img,
    )?;

    Ok(Acquired {
        book_id,
        record,
        downloads: DownloadResult {
            text_path,
            cover_path,
        },
    })
}

/// Acquire one book under the retry policy.
pub fn acquire_book(
    fetcher: &mut Fetcher,
    urls: &SiteUrls,
    book_id: u64,
    options: &CrawlOptions,
    sleep: &dyn Fn(Duration),
) -> BookOutcome<Acquired> {
    run_with_retry(&options.retry, book_id, sleep, |_| {
        acquire_once(fetcher, urls, book_id, options)
    })
}

/// Manifest entry for an acquired book, if its text file is on disk.
pub fn manifest_entry(acquired: &Acquired) -> Option<ManifestEntry> {
    let entry = ManifestEntry::from_parts(&acquired.record, &acquired.downloads)?;
    if entry.book_path.is_file() {
        Some(entry)
    } else {
        tracing::warn!(
            book_id = acquired.book_id,
            path = %entry.book_path.display(),
            "text file missing after download, not recorded"
        );
        None
    }
}

/// Run a whole crawl against the category's site and write the manifest once at the end.
pub fn run(
    fetcher: &mut Fetcher,
    category: &CategoryRef,
    options: &CrawlOptions,
    hooks: &RunHooks<'_>,
) -> Result<RunSummary, CrawlError> {
    let urls = SiteUrls::from(&category.site_base);
    tracing::info!(
        site = %category.site_base,
        category = %category.category_slug,
        pages = category.page_count(),
        "walking catalog"
    );
    let listing = discover(fetcher, category)?;
    tracing::info!(
        category = %category.category_slug,
        pages = listing.pages_requested,
        books = listing.links.len(),
        "catalog walked"
    );

    let outcomes = acquire_all(fetcher, &urls, &listing.links, options, hooks);

    let mut summary = RunSummary {
        pages_requested: listing.pages_requested,
        pages_failed: listing.pages_failed,
        discovered: listing.links.len(),
        manifest_path: options.layout.manifest_path.clone(),
        ..RunSummary::default()
    };
    let mut manifest = Manifest::new();
    for outcome in outcomes {
        match outcome {
            BookOutcome::Succeeded(acquired) => {
                let recorded = manifest_entry(&acquired)
                    .map(|entry| manifest.record(entry))
                    .unwrap_or(false);
                if recorded {
                    summary.recorded += 1;
                } else {
                    summary.not_recorded += 1;
                }
            }
            BookOutcome::SkippedRedirect { .. } => summary.skipped += 1,
            BookOutcome::GivenUp { .. } => summary.given_up += 1,
        }
    }

    manifest.persist(&options.layout.manifest_path)?;
    tracing::info!(
        entries = manifest.len(),
        skipped = summary.skipped,
        given_up = summary.given_up,
        manifest = %summary.manifest_path.display(),
        "manifest written"
    );
    Ok(summary)
}

/// Acquire every book, returning outcomes in the order of `links`.
fn acquire_all(
    fetcher: &mut Fetcher,
    urls: &SiteUrls,
    links: &[BookLink],
    options: &CrawlOptions,
    hooks: &RunHooks<'_>,
) -> Vec<BookOutcome<Acquired>> {
    let total = links.len() as u32;
    let workers = options.workers.clamp(1, links.len().max(1));

    if workers == 1 {
        let mut outcomes = Vec::with_capacity(links.len());
        for (done, link) in links.iter().enumerate() {
            outcomes.push(acquire_book(fetcher, urls, link.book_id, options, hooks.sleep));
            if let Some(progress) = hooks.progress {
                progress(done as u32 + 1, total);
            }
        }
        return outcomes;
    }

    let next = AtomicUsize::new(0);
    let done = AtomicU32::new(0);
    let (tx, rx) = mpsc::channel();
    std::thread::scope(|scope| {
        for _ in 0..workers {
            let mut worker_fetcher = fetcher.clone();
            let tx = tx.clone();
            let (next, done) = (&next, &done);
            scope.spawn(move || loop {
                let index = next.fetch_add(1, Ordering::SeqCst);
                let Some(link) = links.get(index) else {
                    break;
                };
                let outcome =
                    acquire_book(&mut worker_fetcher, urls, link.book_id, options, hooks.sleep);
                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(progress) = hooks.progress {
                    progress(finished, total);
                }
                if tx.send((index, outcome)).is_err() {
                    break;
                }
            });
        }
    });
    drop(tx);

    let mut indexed: Vec<(usize, BookOutcome<Acquired>)> = rx.into_iter().collect();
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, outcome)| outcome).collect()
}
