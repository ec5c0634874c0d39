//! CLI parsing and orchestration. Parses args, merges the config file, runs the crawl, and maps
//! errors to exit codes.

use crate::config::{self, Config};
use crate::model::CategoryRef;
use crate::pipeline::{self, CrawlError, CrawlOptions, OutputLayout, RunHooks, RunSummary};
use crate::retry::{RetryPolicy, DEFAULT_BACKOFF_SECS, DEFAULT_MAX_ATTEMPTS};
use crate::site::{category_slug, Fetcher, SiteUrls, DEFAULT_SITE_BASE};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_DELAY_SECS: u64 = 0;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MANIFEST_NAME: &str = "info.json";

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Crawl(#[from] CrawlError),

    #[error("{given_up} book(s) could not be downloaded (--strict)")]
    Incomplete { given_up: usize },
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Crawl(_) => 3,
            CliRunError::Incomplete { .. } => 4,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "bookcrawl")]
#[command(about = "Download books and covers from a paginated catalog and write a JSON manifest")]
#[command(
    after_help = "Config file keys (site_base, download_folder, json_folder, user_agent, request_delay_secs, timeout_secs, retry_count, retry_backoff_secs, workers) are read from ./bookcrawl.toml or the user config dir. CLI flags override config."
)]
pub struct Args {
    /// Category slug (e.g. l55) or full category URL (e.g. https://tululu.org/l55/).
    #[arg(long, default_value = "l55")]
    pub category: String,

    /// First catalog page (1-based, inclusive).
    #[arg(long, alias = "first_page", default_value_t = 1)]
    pub first_page: u32,

    /// Last catalog page (inclusive). Default: same as --first-page.
    #[arg(long, alias = "last_page")]
    pub last_page: Option<u32>,

    /// Base output directory for Books/, Images/ and the manifest. Default: current directory.
    #[arg(long, alias = "download_folder")]
    pub download_folder: Option<PathBuf>,

    /// Manifest file name, relative to the download folder. Default: info.json.
    #[arg(long, alias = "json_folder")]
    pub json_folder: Option<PathBuf>,

    /// Do not download book texts (books are then not recorded in the manifest).
    #[arg(long, alias = "skip_text")]
    pub skip_text: bool,

    /// Do not download cover images.
    #[arg(long, alias = "skip_img")]
    pub skip_img: bool,

    /// Site root URL (overrides config; default https://tululu.org/).
    #[arg(long)]
    pub site_base: Option<String>,

    /// Attempts per book when the connection fails (overrides config; default 5).
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Seconds to wait between attempts (overrides config; default 10).
    #[arg(long)]
    pub backoff: Option<u64>,

    /// Minimum seconds between requests, shared by all workers (overrides config; default 0).
    #[arg(long)]
    pub delay: Option<u64>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Books downloaded in parallel (overrides config; default 1). Manifest order is unaffected.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Walk the catalog and print the book ids found without downloading anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with code 4 if any book had to be given up.
    #[arg(long)]
    pub strict: bool,

    /// Suppress progress output (warnings and errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging and verbose error chain.
    #[arg(long)]
    pub verbose: bool,
}

/// Settings after merging CLI flags over the config file over defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub urls: SiteUrls,
    pub category: CategoryRef,
    pub crawl: CrawlOptions,
    pub user_agent: Option<String>,
    pub delay_secs: u64,
    pub timeout_secs: u64,
}

/// Merge `args` and `config` and validate the result.
pub fn resolve_settings(args: &Args, config: Option<&Config>) -> Result<Settings, CliRunError> {
    let site_base = args
        .site_base
        .clone()
        .or_else(|| config.and_then(|c| c.site_base.clone()))
        .unwrap_or_else(|| DEFAULT_SITE_BASE.to_string());
    let urls = SiteUrls::new(&site_base)
        .map_err(|e| CliRunError::InvalidInput(format!("Invalid --site-base: {}", e)))?;

    let slug = category_slug(&args.category).ok_or_else(|| {
        CliRunError::InvalidInput(format!(
            "Invalid --category: '{}'. Use a slug like l55 or a category URL like https://tululu.org/l55/",
            args.category
        ))
    })?;
    let last_page = args.last_page.unwrap_or(args.first_page);
    let category = CategoryRef::new(urls.base().clone(), slug, args.first_page, last_page)
        .map_err(|e| CliRunError::InvalidInput(format!("Invalid page range: {}", e)))?;

    let download_folder = args
        .download_folder
        .clone()
        .or_else(|| config.and_then(|c| c.download_folder.clone()))
        .unwrap_or_else(|| PathBuf::from("."));
    let json_folder = args
        .json_folder
        .clone()
        .or_else(|| config.and_then(|c| c.json_folder.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST_NAME));
    if json_folder.as_os_str().is_empty() {
        return Err(CliRunError::InvalidInput(
            "Invalid --json-folder: manifest file name must not be empty".to_string(),
        ));
    }

    let attempts = args
        .attempts
        .or_else(|| config.and_then(|c| c.retry_count))
        .unwrap_or(DEFAULT_MAX_ATTEMPTS);
    if attempts == 0 {
        return Err(CliRunError::InvalidInput(
            "Invalid --attempts: must be at least 1".to_string(),
        ));
    }
    let backoff_secs = args
        .backoff
        .or_else(|| config.and_then(|c| c.retry_backoff_secs))
        .unwrap_or(DEFAULT_BACKOFF_SECS);
    let workers = args
        .workers
        .or_else(|| config.and_then(|c| c.workers))
        .unwrap_or(1);
    if workers == 0 {
        return Err(CliRunError::InvalidInput(
            "Invalid --workers: must be at least 1".to_string(),
        ));
    }

    Ok(Settings {
        urls,
        category,
        crawl: CrawlOptions {
            layout: OutputLayout::new(&download_folder, &json_folder),
            skip_text: args.skip_text,
            skip_img: args.skip_img,
            retry: RetryPolicy::new(attempts, Duration::from_secs(backoff_secs)),
            workers,
        },
        user_agent: args
            .user_agent
            .clone()
            .or_else(|| config.and_then(|c| c.user_agent.clone())),
        delay_secs: args
            .delay
            .or_else(|| config.and_then(|c| c.request_delay_secs))
            .unwrap_or(DEFAULT_DELAY_SECS),
        timeout_secs: args
            .timeout
            .or_else(|| config.and_then(|c| c.timeout_secs))
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    })
}

fn build_fetcher(settings: &Settings) -> Result<Fetcher, CliRunError> {
    let mut builder = Fetcher::builder()
        .delay_secs(settings.delay_secs)
        .timeout_secs(settings.timeout_secs);
    if let Some(ref ua) = settings.user_agent {
        builder = builder.user_agent(ua.clone());
    }
    builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))
}

fn progress_bar() -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new(0);
    let style = indicatif::ProgressStyle::with_template(
        "{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})",
    )
    .map(|s| s.progress_chars("█▉▊▋▌▍▎▏ "))
    .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

/// Entry point for the CLI. Returns the run summary on success.
pub fn run(args: &Args) -> Result<RunSummary, CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let settings = resolve_settings(args, config.as_ref())?;
    let urls = &settings.urls;
    let mut fetcher = build_fetcher(&settings)?;

    if args.dry_run {
        let listing = pipeline::discover(&mut fetcher, &settings.category)
            .map_err(|e| CliRunError::Crawl(e.into()))?;
        for link in &listing.links {
            println!("{}", urls.book_page(link.book_id));
        }
        tracing::info!(
            pages = listing.pages_requested,
            books = listing.links.len(),
            "dry run: nothing downloaded"
        );
        return Ok(RunSummary {
            pages_requested: listing.pages_requested,
            pages_failed: listing.pages_failed,
            discovered: listing.links.len(),
            manifest_path: settings.crawl.layout.manifest_path.clone(),
            ..RunSummary::default()
        });
    }

    let bar = (!args.quiet).then(progress_bar);
    let progress_cb = |done: u32, total: u32| {
        if let Some(ref bar) = bar {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
            bar.set_message(format!("Book {}/{}", done, total));
        }
    };
    let hooks = RunHooks {
        progress: Some(&progress_cb),
        ..RunHooks::default()
    };

    let summary = pipeline::run(&mut fetcher, &settings.category, &settings.crawl, &hooks)?;

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    if !args.quiet {
        eprintln!(
            "Downloaded {} of {} book(s) ({} missing, {} failed). Manifest: {}",
            summary.recorded,
            summary.discovered,
            summary.skipped,
            summary.given_up,
            summary.manifest_path.display()
        );
    }
    if args.strict && summary.given_up > 0 {
        return Err(CliRunError::Incomplete {
            given_up: summary.given_up,
        });
    }
    Ok(summary)
}
