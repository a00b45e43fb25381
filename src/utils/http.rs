// src/utils/http.rs

//! HTTP client utilities.
//!
//! Every request of the pipeline goes through [`HttpClient`], which retries
//! connection-level failures with a linearly growing delay and reports any
//! other failure as an absent result.

use std::time::Duration;

use chrono::Utc;
use reqwest::header::{ETAG, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::{RequestBuilder, Response, StatusCode};

use crate::error::Result;
use crate::models::HttpConfig;
use crate::utils::cache::{CacheMeta, CachePolicy, CachedPage, ResponseCache};

/// A downloaded HTML page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// URL after following redirects
    pub url: String,
    pub html: String,
}

/// Shared HTTP session used by every stage.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    max_retries: u32,
    backoff: Duration,
    cache: Option<ResponseCache>,
}

impl HttpClient {
    /// Create a configured asynchronous HTTP client.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let cache = (!config.cache_dir.is_empty()).then(|| {
            ResponseCache::new(&config.cache_dir, config.cache_forever_hosts.clone())
        });

        Ok(Self {
            client,
            max_retries: config.max_retries.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
            cache,
        })
    }

    /// Replace the page cache (or disable it with `None`).
    pub fn with_cache(mut self, cache: Option<ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Send a request built by `build`, retrying connection errors and timeouts.
    ///
    /// Returns `None` when retries are exhausted, on any other transport
    /// error, or when the server answers with a non-2xx status.
    pub async fn send<F>(&self, url: &str, build: F) -> Option<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let response = self.send_with_retry(url, build).await?;
        success(url, response)
    }

    /// Send a request exactly once; for uploads and other non-idempotent calls.
    ///
    /// Failures are reported as in [`HttpClient::send`].
    pub async fn send_once<F>(&self, url: &str, build: F) -> Option<Response>
    where
        F: FnOnce(&reqwest::Client) -> RequestBuilder,
    {
        match build(&self.client).send().await {
            Ok(response) => success(url, response),
            Err(e) => {
                log::error!("Request to {} failed: {}", url, e);
                None
            }
        }
    }

    /// Plain GET through [`HttpClient::send`].
    pub async fn get(&self, url: &str) -> Option<Response> {
        self.send(url, |client| client.get(url)).await
    }

    /// Download an HTML page, consulting the response cache.
    pub async fn get_page(&self, url: &str) -> Option<Page> {
        let mut revalidate: Option<CachedPage> = None;

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(url).await {
                if cache.policy_for(url) == CachePolicy::Forever {
                    log::debug!("Cache hit for {}", url);
                    return Some(Page {
                        url: hit.meta.final_url,
                        html: hit.body,
                    });
                }
                if hit.meta.has_validators() {
                    revalidate = Some(hit);
                }
            }
        }

        let response = self
            .send_with_retry(url, |client| {
                let mut request = client.get(url);
                if let Some(hit) = &revalidate {
                    if let Some(etag) = &hit.meta.etag {
                        request = request.header(IF_NONE_MATCH, etag);
                    }
                    if let Some(modified) = &hit.meta.last_modified {
                        request = request.header(IF_MODIFIED_SINCE, modified);
                    }
                }
                request
            })
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            if let Some(hit) = revalidate {
                log::debug!("Not modified: {}", url);
                return Some(Page {
                    url: hit.meta.final_url,
                    html: hit.body,
                });
            }
        }
        if !status.is_success() {
            log::error!("ERROR {} when getting url={}", status.as_u16(), url);
            return None;
        }

        let final_url = response.url().to_string();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let etag = header(ETAG);
        let last_modified = header(LAST_MODIFIED);

        let html = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                log::error!("Failed to read body of {}: {}", url, e);
                return None;
            }
        };

        if let Some(cache) = &self.cache {
            let meta = CacheMeta {
                url: url.to_string(),
                final_url: final_url.clone(),
                etag,
                last_modified,
                stored_at: Utc::now(),
            };
            if let Err(e) = cache.put(&meta, &html).await {
                log::warn!("Could not cache {}: {}", url, e);
            }
        }

        log::debug!("Downloaded page {}", url);
        Some(Page {
            url: final_url,
            html,
        })
    }

    async fn send_with_retry<F>(&self, url: &str, build: F) -> Option<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            match build(&self.client).send().await {
                Ok(response) => return Some(response),
                Err(e) if e.is_connect() || e.is_timeout() => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        log::error!("FAILED TO RETRIEVE: {} ({})", url, e);
                        return None;
                    }
                    log::warn!(
                        "Connection error ('{}'); about to perform retry {} of {}.",
                        e,
                        attempt,
                        self.max_retries - 1
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => {
                    log::error!("Request to {} failed: {}", url, e);
                    return None;
                }
            }
        }
    }
}

fn success(url: &str, response: Response) -> Option<Response> {
    let status = response.status();
    if !status.is_success() {
        log::error!("ERROR {} when getting url={}", status.as_u16(), url);
        return None;
    }
    Some(response)
}
