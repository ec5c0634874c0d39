//! Per-book retry controller.
//!
//! Each book is tried up to `max_attempts` times. Only connection failures are retried, with a
//! fixed sleep between attempts. A redirect means the book does not exist and is skipped quietly.
//! HTTP, parse and filesystem errors abandon the book at once.

use crate::download::DownloadError;
use crate::site::{FetchError, ParseError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BACKOFF_SECS: u64 = 10;

/// Attempt budget and fixed backoff for one book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_secs(DEFAULT_BACKOFF_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

/// Why a single acquisition attempt failed.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Resource does not exist (redirected): {url}")]
    Redirected { url: String },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<DownloadError> for AcquireError {
    fn from(e: DownloadError) -> Self {
        match e {
            DownloadError::Fetch(e) => AcquireError::Fetch(e),
            DownloadError::Redirected { url } => AcquireError::Redirected { url },
            DownloadError::Io { path, source } => AcquireError::Io { path, source },
        }
    }
}

/// What the controller does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Retry,
    Skip,
    GiveUp,
}

impl AcquireError {
    pub fn disposition(&self) -> Disposition {
        match self {
            AcquireError::Fetch(e) if e.is_connection() => Disposition::Retry,
            AcquireError::Redirected { .. } => Disposition::Skip,
            AcquireError::Fetch(_) | AcquireError::Parse(_) | AcquireError::Io { .. } => {
                Disposition::GiveUp
            }
        }
    }
}

/// Terminal state of one book.
#[derive(Debug)]
pub enum BookOutcome<T> {
    Succeeded(T),
    /// The site redirected: the book (or its text) does not exist.
    SkippedRedirect { url: String },
    GivenUp { attempts: u32, reason: String },
}

/// Run `attempt` under `policy`. `sleep` is called between attempts, never after the last one.
///
/// `attempt` receives the 1-based attempt number.
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    book_id: u64,
    sleep: &dyn Fn(Duration),
    mut attempt: F,
) -> BookOutcome<T>
where
    F: FnMut(u32) -> Result<T, AcquireError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut connected = true;
    let mut last_error = String::new();

    for n in 1..=max_attempts {
        let err = match attempt(n) {
            Ok(value) => return BookOutcome::Succeeded(value),
            Err(e) => e,
        };
        match err.disposition() {
            Disposition::Skip => {
                let url = match err {
                    AcquireError::Redirected { url } => url,
                    other => other.to_string(),
                };
                tracing::debug!(book_id, url = %url, "book does not exist, skipping");
                return BookOutcome::SkippedRedirect { url };
            }
            Disposition::GiveUp => {
                tracing::error!(book_id, "giving up on book: {}", err);
                return BookOutcome::GivenUp {
                    attempts: n,
                    reason: err.to_string(),
                };
            }
            Disposition::Retry => {
                if connected {
                    connected = false;
                    tracing::warn!(book_id, attempt = n, "connection lost: {}", err);
                } else {
                    tracing::warn!(book_id, attempt = n, "still no connection: {}", err);
                }
                last_error = err.to_string();
                if n < max_attempts {
                    tracing::info!(book_id, "retrying in {} seconds", policy.backoff.as_secs_f64());
                    sleep(policy.backoff);
                }
            }
        }
    }

    tracing::error!(
        book_id,
        attempts = max_attempts,
        "giving up on book after repeated connection failures"
    );
    BookOutcome::GivenUp {
        attempts: max_attempts,
        reason: last_error,
    }
}
