//! Page fetching for the task pipeline.
//!
//! Uses a shared reqwest client with browser-like headers. Sites that
//! require JavaScript rendering are out of scope; they surface downstream
//! as insufficient-content failures.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Hard timeout for a page fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Bodies shorter than this are unusable.
pub const MIN_HTML_LEN: usize = 100;

/// Failure fetching a page body, classified for message clarity.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("request timeout: website took too long to respond")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    Connect(String),

    #[error("access denied ({status}): website may be blocking automated requests")]
    AccessDenied { status: u16 },

    #[error("rate limited ({status}): too many requests, try again later")]
    RateLimited { status: u16 },

    #[error("server error ({status}): the website's server is experiencing issues")]
    UpstreamServer { status: u16 },

    #[error("failed to fetch website: HTTP {status}")]
    Status { status: u16 },

    #[error("website returned empty or very short content")]
    EmptyBody,
}

impl FetchError {
    /// Classify a non-success HTTP status. 471 shows up from
    /// Cloudflare-style anti-bot layers and is treated like 403.
    pub fn from_status(status: u16) -> Self {
        match status {
            403 | 471 => FetchError::AccessDenied { status },
            429 => FetchError::RateLimited { status },
            s if s >= 500 => FetchError::UpstreamServer { status },
            _ => FetchError::Status { status },
        }
    }
}

/// Trait seam for page fetching, mockable in tests.
#[async_trait]
pub trait BasePageFetcher: Send + Sync {
    /// Fetch the raw HTML body of a URL.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// HTTP page fetcher backed by reqwest.
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new() -> Result<Self> {
        // Browser-like headers reduce trivial bot blocking
        let user_agent = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .parse()
                .unwrap(),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            "en-US,en;q=0.9".parse().unwrap(),
        );
        headers.insert(reqwest::header::CACHE_CONTROL, "no-cache".parse().unwrap());
        headers.insert(
            reqwest::header::UPGRADE_INSECURE_REQUESTS,
            "1".parse().unwrap(),
        );

        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl BasePageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url = %url, "fetching page");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Connect(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Connect(e.to_string()))
    }
}

/// Default the scheme to https:// when none is present.
pub fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}
