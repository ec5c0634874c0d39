//! Blocking HTTP fetcher with optional politeness delay. Redirects are never followed: the site
//! answers unknown resources with a redirect to its home page, so a 3xx is reported as
//! [`Fetched::Redirected`] and left for the caller to treat as "does not exist".
//!
//! No retries happen at this layer; see [`crate::retry`].

use super::error::FetchError;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use url::Url;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; bookcrawl/0.1)";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DELAY_SECS: u64 = 0;

/// Fully-read response to a successful (2xx) GET.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Final URL of the response; used to resolve relative links on the page.
    pub url: Url,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Outcome of a GET that reached the server and was not an HTTP error.
#[derive(Debug, Clone)]
pub enum Fetched {
    Page(RawResponse),
    /// The server answered with a redirect. `location` is the raw Location header, if any.
    Redirected {
        url: String,
        location: Option<String>,
    },
}

/// Blocking HTTP client that enforces a delay between requests.
///
/// Cloning is cheap. Clones share the connection pool and the request clock, so the delay
/// holds for the host as a whole when clones run on separate threads.
#[derive(Debug, Clone)]
pub struct Fetcher {
    inner: reqwest::blocking::Client,
    delay: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl Fetcher {
    /// Build a fetcher with default User-Agent, timeout, and no delay.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    pub fn builder() -> FetcherBuilder {
        FetcherBuilder::default()
    }

    /// GET `url` with optional query parameters.
    ///
    /// Returns `Fetched::Redirected` for any 3xx, `FetchError::Http` for other non-2xx,
    /// and `FetchError::Connection` when the request or body read fails in transport.
    pub fn fetch(&mut self, url: &str, query: &[(&str, String)]) -> Result<Fetched, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            input: url.to_string(),
            reason: e.to_string(),
        })?;
        self.wait_turn();
        let mut request = self.inner.get(parsed);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().map_err(|e| FetchError::Connection {
            url: url.to_string(),
            source: e,
        })?;

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            return Ok(Fetched::Redirected {
                url: response.url().to_string(),
                location,
            });
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let final_url = response.url().clone();
        let body = response.bytes().map_err(|e| FetchError::Connection {
            url: url.to_string(),
            source: e,
        })?;
        Ok(Fetched::Page(RawResponse {
            url: final_url,
            body: body.to_vec(),
        }))
    }

    /// Block until `delay` has passed since the previous request started on any clone, then
    /// claim the slot.
    fn wait_turn(&self) {
        if self.delay.is_zero() {
            return;
        }
        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.delay {
                std::thread::sleep(self.delay - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

/// Builder for Fetcher with optional User-Agent, delay, and timeout.
#[derive(Debug)]
pub struct FetcherBuilder {
    user_agent: Option<String>,
    delay_secs: u64,
    timeout_secs: u64,
}

impl Default for FetcherBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            delay_secs: DEFAULT_DELAY_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl FetcherBuilder {
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Delay between requests in seconds. Default 0.
    pub fn delay_secs(mut self, secs: u64) -> Self {
        self.delay_secs = secs;
        self
    }

    /// Request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<Fetcher, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Fetcher {
            inner,
            delay: Duration::from_secs(self.delay_secs),
            last_request: Arc::default(),
        })
    }
}
