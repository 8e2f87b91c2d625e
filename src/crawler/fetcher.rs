//! HTTP page fetcher
//!
//! A fetch either succeeds with extracted text and out-links or fails with a
//! classified [`FetchErrorKind`]. Failures are data, not control flow: a bad
//! page must never abort the surrounding site crawl, so this layer returns a
//! [`FetchResult`] in every case and lets the site crawler decide on retries.

use crate::config::UserAgentConfig;
use crate::crawler::parser::parse_page;
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use url::Url;

/// Classification of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The request exceeded the configured hard timeout
    Timeout,

    /// Connection, TLS, or transport failure
    Connection,

    /// Non-success HTTP response
    Http { status: u16 },

    /// Response was not parseable HTML (wrong content type or broken markup)
    Parse,
}

impl FetchErrorKind {
    /// Transient failures are the only ones the site crawler may retry:
    /// timeouts, connection errors, and server-side 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchErrorKind::Timeout | FetchErrorKind::Connection => true,
            FetchErrorKind::Http { status } => *status >= 500,
            FetchErrorKind::Parse => false,
        }
    }
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchErrorKind::Timeout => write!(f, "timeout"),
            FetchErrorKind::Connection => write!(f, "connection error"),
            FetchErrorKind::Http { status } => write!(f, "HTTP {}", status),
            FetchErrorKind::Parse => write!(f, "parse error"),
        }
    }
}

/// Outcome of a single fetch
#[derive(Debug, Clone)]
pub enum FetchStatus {
    /// Page retrieved and parsed
    Success {
        /// Visible page text, newline-separated (pre-cleaning)
        text: String,
        /// Page title, if any
        title: Option<String>,
        /// Absolute out-links found on the page
        links: Vec<String>,
    },

    /// Fetch failed; the kind drives retry policy and reporting
    Failure {
        kind: FetchErrorKind,
        message: String,
    },
}

/// Result of fetching one URL, success or not
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The (normalized) URL that was fetched
    pub url: Url,

    /// Success or classified failure
    pub status: FetchStatus,

    /// Wall-clock time spent on this fetch
    pub elapsed: Duration,
}

impl FetchResult {
    pub fn failure(url: Url, kind: FetchErrorKind, message: String, elapsed: Duration) -> Self {
        Self {
            url,
            status: FetchStatus::Failure { kind, message },
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, FetchStatus::Success { .. })
    }

    pub fn error_kind(&self) -> Option<FetchErrorKind> {
        match &self.status {
            FetchStatus::Success { .. } => None,
            FetchStatus::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// Fetches a single page; the seam the crawler fans out over
///
/// Implementations must be cheap to share behind an `Arc` and safe to call
/// concurrently. Tests instrument this trait to count in-flight calls.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> FetchResult;
}

/// reqwest-backed fetcher with a hard per-request timeout
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Builds an HTTP fetcher
    ///
    /// The client timeout and an outer `tokio::time::timeout` both carry the
    /// configured limit so a stalled body read cannot hold a fetch slot open.
    pub fn new(user_agent: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let ua = match &user_agent.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                user_agent.scraper_name, user_agent.scraper_version, contact
            ),
            None => format!("{}/{}", user_agent.scraper_name, user_agent.scraper_version),
        };

        let client = Client::builder()
            .user_agent(ua)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult {
        let started = Instant::now();

        let response = match tokio::time::timeout(self.timeout, self.client.get(url.clone()).send())
            .await
        {
            Err(_) => {
                return FetchResult::failure(
                    url.clone(),
                    FetchErrorKind::Timeout,
                    format!("no response within {:?}", self.timeout),
                    started.elapsed(),
                );
            }
            Ok(Err(e)) => {
                let kind = if e.is_timeout() {
                    FetchErrorKind::Timeout
                } else {
                    FetchErrorKind::Connection
                };
                return FetchResult::failure(url.clone(), kind, e.to_string(), started.elapsed());
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if !status.is_success() {
            return FetchResult::failure(
                url.clone(),
                FetchErrorKind::Http {
                    status: status.as_u16(),
                },
                format!("HTTP {}", status),
                started.elapsed(),
            );
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // Missing content-type is tolerated; an explicit non-HTML type is not.
        if !content_type.is_empty() && !content_type.contains("text/html") {
            return FetchResult::failure(
                url.clone(),
                FetchErrorKind::Parse,
                format!("expected HTML, got {}", content_type),
                started.elapsed(),
            );
        }

        let body = match tokio::time::timeout(self.timeout, response.text()).await {
            Err(_) => {
                return FetchResult::failure(
                    url.clone(),
                    FetchErrorKind::Timeout,
                    "body read timed out".to_string(),
                    started.elapsed(),
                );
            }
            Ok(Err(e)) => {
                return FetchResult::failure(
                    url.clone(),
                    FetchErrorKind::Connection,
                    e.to_string(),
                    started.elapsed(),
                );
            }
            Ok(Ok(body)) => body,
        };

        match parse_page(&body, url) {
            Ok(parsed) => FetchResult {
                url: url.clone(),
                status: FetchStatus::Success {
                    text: parsed.text,
                    title: parsed.title,
                    links: parsed.links,
                },
                elapsed: started.elapsed(),
            },
            Err(e) => FetchResult::failure(url.clone(), FetchErrorKind::Parse, e, started.elapsed()),
        }
    }
}
