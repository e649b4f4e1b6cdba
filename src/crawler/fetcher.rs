//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building HTTP clients with the configured user agent, cookie and timeouts
//! - Bounded retry rounds with a fixed delay between attempts
//! - Escalating retry exhaustion to an injected decision handler

use crate::config::FetchConfig;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Gave up on {url} after {attempts} attempts: {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    Header(String),
}

/// Source of raw page content
///
/// A returned page is a success; an error means the fetcher has given up on
/// the locator and the owning source cannot continue.
pub trait ContentFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// What to do once a round of retries has been used up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Start another full round of attempts
    Continue,
    /// Give up on the locator
    Abort,
}

/// Decides whether an exhausted fetch keeps going
pub trait ExhaustionHandler: Send + Sync {
    fn on_exhausted(&self, url: &str, attempts: u32, last_error: &FetchError) -> RetryDecision;
}

/// Gives up as soon as the first retry round is exhausted
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnExhaustion;

impl ExhaustionHandler for AbortOnExhaustion {
    fn on_exhausted(&self, _url: &str, _attempts: u32, _last_error: &FetchError) -> RetryDecision {
        RetryDecision::Abort
    }
}

impl<F> ExhaustionHandler for F
where
    F: Fn(&str, u32) -> RetryDecision + Send + Sync,
{
    fn on_exhausted(&self, url: &str, attempts: u32, _last_error: &FetchError) -> RetryDecision {
        self(url, attempts)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use doulist_harvester::config::FetchConfig;
/// use doulist_harvester::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = config.cookie.as_deref().filter(|c| !c.trim().is_empty()) {
        let value = HeaderValue::from_str(cookie.trim())
            .map_err(|e| FetchError::Header(format!("cookie: {}", e)))?;
        headers.insert(COOKIE, value);
    }

    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(config.timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Fetches pages over HTTP with bounded retry rounds
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | 2xx | Return body |
/// | Non-2xx status | Count as failed attempt |
/// | Transport error / timeout | Count as failed attempt |
/// | Round exhausted | Ask the exhaustion handler: new round or abort |
///
/// Rounds are iterated in a loop, so repeated "continue" decisions never grow
/// the stack.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    retries: u32,
    retry_delay: Duration,
    handler: Arc<dyn ExhaustionHandler>,
}

impl HttpFetcher {
    /// Creates a fetcher that aborts once a retry round is exhausted
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        Self::with_handler(config, Arc::new(AbortOnExhaustion))
    }

    pub fn with_handler(
        config: &FetchConfig,
        handler: Arc<dyn ExhaustionHandler>,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_http_client(config)?,
            retries: config.retries.max(1),
            retry_delay: config.retry_delay(),
            handler,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| transport_error(url, e))
    }
}

impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempts: u32 = 0;

        loop {
            let mut last_error = None;

            for attempt in 1..=self.retries {
                attempts += 1;
                match self.fetch_once(url).await {
                    Ok(body) => return Ok(body),
                    Err(e) => {
                        tracing::warn!(
                            "Request failed (attempt {}/{}) for {}: {}",
                            attempt,
                            self.retries,
                            url,
                            e
                        );
                        last_error = Some(e);
                        if attempt < self.retries {
                            tokio::time::sleep(self.retry_delay).await;
                        }
                    }
                }
            }

            let last_error = last_error.unwrap_or_else(|| FetchError::Transport {
                url: url.to_string(),
                message: "no attempt made".to_string(),
            });

            match self.handler.on_exhausted(url, attempts, &last_error) {
                RetryDecision::Continue => {
                    tracing::info!("Retry budget exhausted for {}, starting another round", url);
                }
                RetryDecision::Abort => {
                    tracing::error!("Giving up on {} after {} attempts", url, attempts);
                    return Err(FetchError::Exhausted {
                        url: url.to_string(),
                        attempts,
                        last_error: last_error.to_string(),
                    });
                }
            }
        }
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> FetchError {
    let message = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    };

    FetchError::Transport {
        url: url.to_string(),
        message,
    }
}
