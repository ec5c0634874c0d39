//! bookcrawl: crawls a paginated book catalog, downloads texts and covers, and writes a JSON manifest.

pub mod cli;
pub mod config;
pub mod download;
pub mod logging;
pub mod manifest;
pub mod model;
pub mod pipeline;
pub mod retry;
pub mod site;

// Re-exports for CLI and consumers.
pub use manifest::{Manifest, ManifestError};
pub use model::{BookLink, BookRecord, CategoryRef, DownloadResult, ManifestEntry};
pub use pipeline::{CrawlError, CrawlOptions, OutputLayout, RunHooks, RunSummary};
pub use retry::{AcquireError, BookOutcome, RetryPolicy};
pub use site::{FetchError, Fetched, Fetcher, FetcherBuilder, ParseError, SiteUrls};
