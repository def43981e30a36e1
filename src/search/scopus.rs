//! Scopus Search API Client
//!
//! Executes boolean queries against the Elsevier Scopus Search API:
//!
//! - `GET {base}/content/search/scopus?query=...&count=...&start=0`
//! - Authentication through the `X-ELS-APIKey` header (sent lowercase)
//! - JSON body under `search-results`, with `entry` records and `next` links
//!
//! ## Fetch Modes
//!
//! 1. **Page**: a single request returning at most `count` entries
//! 2. **All**: follows `next` links until the API stops offering one, up to
//!    the 5000 result offset limit. A failing later page keeps earlier pages.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::backend::{FetchMode, RawEntry, RawResultSet, SearchBackend, SearchError};
use crate::config::ScopusConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.elsevier.com";
const SEARCH_PATH: &str = "/content/search/scopus";
const API_KEY_HEADER: &str = "x-els-apikey";
/// Scopus refuses `start` offsets past this many results without a cursor
pub const MAX_OFFSET_RESULTS: usize = 5000;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "search-results", default)]
    results: SearchResults,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResults {
    #[serde(rename = "opensearch:totalResults", default)]
    total_results: Option<Value>,
    #[serde(default)]
    entry: Vec<RawEntry>,
    #[serde(default)]
    link: Vec<SearchLink>,
}

#[derive(Debug, Deserialize)]
struct SearchLink {
    #[serde(rename = "@ref", default)]
    rel: String,
    #[serde(rename = "@href", default)]
    href: String,
}

impl SearchResults {
    fn total(&self) -> Option<u64> {
        match self.total_results.as_ref()? {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    fn next_link(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|link| link.rel == "next" && !link.href.is_empty())
            .map(|link| link.href.as_str())
    }
}

/// Scopus client for sub-keyword searches
pub struct ScopusClient {
    http: Client,
    base_url: String,
}

impl ScopusClient {
    /// Create a client against the public Scopus endpoint
    pub fn new(api_key: &str) -> Result<Self, SearchError> {
        Self::build(api_key, DEFAULT_BASE_URL, None)
    }

    /// Configure client from config
    pub fn from_config(config: &ScopusConfig) -> Result<Self, SearchError> {
        Self::build(
            &config.api_key,
            &config.base_url,
            config.timeout_secs.map(Duration::from_secs),
        )
    }

    fn build(api_key: &str, base_url: &str, timeout: Option<Duration>) -> Result<Self, SearchError> {
        if api_key.trim().is_empty() {
            return Err(SearchError::NoApiKey);
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key.trim())
            .map_err(|e| SearchError::RequestFailed(format!("invalid API key header: {}", e)))?;
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}{}", self.base_url, SEARCH_PATH)
    }

    async fn fetch_first(&self, query: &str, count: u32) -> Result<SearchResults, SearchError> {
        let count = count.to_string();
        let request = self
            .http
            .get(self.search_url())
            .query(&[("query", query), ("count", count.as_str()), ("start", "0")]);
        Self::send(request).await
    }

    async fn fetch_link(&self, href: &str) -> Result<SearchResults, SearchError> {
        Self::send(self.http.get(href)).await
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<SearchResults, SearchError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SearchError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| SearchError::ParseError(e.to_string()))?;
        Ok(parsed.results)
    }
}

#[async_trait]
impl SearchBackend for ScopusClient {
    async fn search(&self, query: &str, mode: FetchMode) -> Result<RawResultSet, SearchError> {
        debug!(query = %query, ?mode, "Searching Scopus");

        let first = self.fetch_first(query, mode.page_size()).await?;
        let total_results = first.total();
        let mut result = RawResultSet {
            total_results,
            entries: first.entry,
        };

        if matches!(mode, FetchMode::Page { .. }) || result.is_empty_result() {
            return Ok(result);
        }

        let mut next = first.link.into_iter().find(|l| l.rel == "next").map(|l| l.href);
        let mut visited = HashSet::new();
        let mut pages = 1usize;
        while let Some(href) = next.take().filter(|h| !h.is_empty()) {
            if let Some(total) = total_results {
                if result.entries.len() as u64 >= total {
                    break;
                }
            }
            if result.entries.len() >= MAX_OFFSET_RESULTS {
                warn!(query = %query, limit = MAX_OFFSET_RESULTS, "Scopus offset limit reached, stopping");
                break;
            }
            if !visited.insert(href.clone()) {
                warn!(query = %query, href = %href, "Scopus next links form a cycle, stopping");
                break;
            }

            let page = match self.fetch_link(&href).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(query = %query, pages, error = %e, "Scopus page fetch failed, keeping earlier pages");
                    break;
                }
            };
            pages += 1;
            if page.entry.is_empty() {
                break;
            }

            next = page.next_link().map(String::from);
            result.entries.extend(page.entry);
        }
        result.entries.truncate(MAX_OFFSET_RESULTS);

        info!(query = %query, pages, entries = result.entries.len(), "Scopus pagination finished");
        Ok(result)
    }
}

/// Pull the human readable reason out of a Scopus error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/service-error/status/statusText")
                .or_else(|| v.pointer("/error-response/error-message"))
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}
