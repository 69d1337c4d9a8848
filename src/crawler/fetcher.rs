//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with a per-call timeout
//! - Manual redirect following with chain recording and loop detection
//! - Error classification

use crate::config::UserAgentConfig;
use crate::storage::RedirectHop;
use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::{redirect::Policy, Client};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Response body
    pub content: String,
    /// Status of the final response
    pub http_status: u16,
    /// URL the content was served from, after redirects
    pub final_url: Url,
    /// Every redirect response on the way, in order
    pub redirect_chain: Vec<RedirectHop>,
}

/// Reasons a fetch produced no usable page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status} from {final_url}")]
    HttpStatus { status: u16, final_url: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Redirect loop at {0}")]
    RedirectLoop(String),

    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(usize),

    #[error("Invalid redirect: {0}")]
    InvalidRedirect(String),
}

impl FetchError {
    /// The HTTP status that caused the failure, if any
    pub fn http_status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Retrieves page content for the worker
///
/// Implementations must report every network problem as a `FetchError`
/// rather than panicking.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are disabled on the client; [`HttpFetcher`] follows them itself
/// so it can record each hop.
///
/// # Example
///
/// ```no_run
/// use tidewater::config::UserAgentConfig;
/// use tidewater::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_redirects: usize,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig, max_redirects: usize) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?, max_redirects))
    }

    /// Uses an existing client, which must not follow redirects itself
    pub fn with_client(client: Client, max_redirects: usize) -> Self {
        Self {
            client,
            max_redirects,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    /// Fetches a URL, following redirects by hand
    ///
    /// # Request Flow
    ///
    /// 1. GET the current URL
    /// 2. On 3xx, resolve `Location` against the current URL, record the hop
    ///    and continue; a repeated target is a loop
    /// 3. Any other non-2xx status is a failure
    /// 4. On 2xx, read the body
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let mut current = url.clone();
        let mut redirect_chain = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(current.to_string());

        loop {
            let response = self
                .client
                .get(current.clone())
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| classify_error(e, timeout))?;

            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        FetchError::InvalidRedirect(format!("{} without Location from {}", status, current))
                    })?;

                let next = current
                    .join(location)
                    .map_err(|e| FetchError::InvalidRedirect(format!("{}: {}", location, e)))?;

                redirect_chain.push(RedirectHop {
                    url: current.to_string(),
                    status: status.as_u16(),
                });

                if redirect_chain.len() > self.max_redirects {
                    return Err(FetchError::TooManyRedirects(self.max_redirects));
                }

                if !visited.insert(next.to_string()) {
                    return Err(FetchError::RedirectLoop(next.to_string()));
                }

                tracing::debug!("Redirect {} -> {} ({})", current, next, status);
                current = next;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::HttpStatus {
                    status: status.as_u16(),
                    final_url: current.to_string(),
                });
            }

            let content = response
                .text()
                .await
                .map_err(|e| classify_error(e, timeout))?;

            return Ok(FetchedPage {
                content,
                http_status: status.as_u16(),
                final_url: current,
                redirect_chain,
            });
        }
    }
}

fn classify_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else if error.is_connect() {
        FetchError::Network(format!("Connection failed: {}", error))
    } else {
        FetchError::Network(error.to_string())
    }
}
