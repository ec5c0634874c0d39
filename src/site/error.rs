//! Error types for talking to the catalog site and reading its pages.

use thiserror::Error;

/// Failure of a single GET. Redirects are not errors here; see [`Fetched`](super::Fetched).
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure: DNS, refused connection, timeout, truncated body.
    #[error("Network error: could not reach {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} when fetching: {url}")]
    Http { status: u16, url: String },

    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },
}

impl FetchError {
    /// True for failures that may go away by trying again later.
    pub fn is_connection(&self) -> bool {
        matches!(self, FetchError::Connection { .. })
    }
}

/// The page did not have the structure the parser expects.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Could not parse book page {url}: {message}")]
    BookPage { url: String, message: String },

    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },
}
