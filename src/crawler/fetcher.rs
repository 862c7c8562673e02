//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Routing requests through an optional cache server
//! - Reading bodies up to a size ceiling
//! - Turning transport failures into an error response instead of an `Err`

use crate::config::{CrawlerConfig, UserAgentConfig};
use reqwest::{redirect::Policy, Client, Proxy};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Outcome of fetching one URL
///
/// A response with status 200 and a non-empty body is a success; anything
/// else leaves nothing to extract.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    /// HTTP status code, 0 when no response was received
    pub status: u16,

    /// Final URL after redirects (the requested URL when unknown)
    pub url: String,

    /// Response body, possibly cut just past the size ceiling
    pub body: Option<Vec<u8>>,

    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,

    /// Transport error description, if the request failed
    pub error: Option<String>,
}

impl FetchResponse {
    /// Builds a response describing a failed request
    pub fn failed(url: &str, error: impl Into<String>) -> Self {
        Self {
            status: 0,
            url: url.to_string(),
            body: None,
            headers: HashMap::new(),
            error: Some(error.into()),
        }
    }

    /// Returns the declared content type, if any
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    /// Returns true for status 200 with a non-empty body
    pub fn is_success(&self) -> bool {
        self.status == 200 && self.body.as_ref().map_or(false, |b| !b.is_empty())
    }
}

/// Something that can turn a URL into a [`FetchResponse`]
///
/// Implementations never fail: transport errors are reported through
/// [`FetchResponse::error`].
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = FetchResponse> + Send;
}

/// Formats the crawler's user agent string
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn build_user_agent(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Crawler settings (timeout and optional cache server)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(build_user_agent(user_agent))
        .timeout(Duration::from_secs(crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true);

    if let Some(cache_server) = &crawler.cache_server {
        builder = builder.proxy(Proxy::all(cache_server.as_str())?);
    }

    builder.build()
}

/// Production fetcher backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Creates a fetcher from the crawler and user agent configuration
    pub fn new(user_agent: &UserAgentConfig, crawler: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent, crawler)?,
            max_body_bytes: crawler.max_body_bytes,
        })
    }

    async fn fetch_inner(&self, url: &str) -> Result<FetchResponse, reqwest::Error> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();

        // Stop one byte past the ceiling so the extractor can tell the body was too large
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() > self.max_body_bytes {
                body.truncate(self.max_body_bytes + 1);
                debug!("Body of {} exceeds {} bytes, stopped reading", url, self.max_body_bytes);
                break;
            }
        }

        Ok(FetchResponse {
            status,
            url: final_url,
            body: Some(body),
            headers,
            error: None,
        })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResponse {
        match self.fetch_inner(url).await {
            Ok(response) => response,
            Err(e) => {
                let kind = if e.is_timeout() {
                    "Request timeout"
                } else if e.is_connect() {
                    "Connection failed"
                } else {
                    "Request failed"
                };
                let mut response = FetchResponse::failed(url, format!("{}: {}", kind, e));
                if let Some(status) = e.status() {
                    response.status = status.as_u16();
                }
                response
            }
        }
    }
}
