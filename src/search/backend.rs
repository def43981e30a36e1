use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Error text Scopus places in the single entry of an empty result set
pub const EMPTY_RESULT_SENTINEL: &str = "Result set was empty";

/// One raw result entry exactly as the API returned it
pub type RawEntry = Map<String, Value>;

/// Errors that can occur while executing one search
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Scopus API key not configured")]
    NoApiKey,

    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Search API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse search results: {0}")]
    ParseError(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::RequestFailed(err.to_string())
    }
}

/// How many results a single query fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum FetchMode {
    /// One page of `count` results
    Page { count: u32 },
    /// Follow `next` links until the result set is exhausted
    All { page_size: u32 },
}

impl FetchMode {
    pub fn page_size(&self) -> u32 {
        match self {
            FetchMode::Page { count } => *count,
            FetchMode::All { page_size } => *page_size,
        }
    }
}

impl Default for FetchMode {
    fn default() -> Self {
        FetchMode::Page { count: 10 }
    }
}

/// Heterogeneous result set returned by one search call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResultSet {
    pub total_results: Option<u64>,
    pub entries: Vec<RawEntry>,
}

impl RawResultSet {
    pub fn new(entries: Vec<RawEntry>) -> Self {
        Self {
            total_results: None,
            entries,
        }
    }

    /// The upstream "no matches" signal, distinct from an error
    pub fn empty_sentinel() -> Self {
        let mut entry = RawEntry::new();
        entry.insert("@_fa".to_string(), Value::String("true".to_string()));
        entry.insert("error".to_string(), Value::String(EMPTY_RESULT_SENTINEL.to_string()));
        Self {
            total_results: Some(0),
            entries: vec![entry],
        }
    }

    /// True when the set carries no records: either no entries at all or the
    /// explicit empty-result entry.
    pub fn is_empty_result(&self) -> bool {
        self.entries.is_empty()
            || self.entries.iter().any(|entry| {
                entry.get("error").and_then(Value::as_str) == Some(EMPTY_RESULT_SENTINEL)
            })
    }
}

/// External search API
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, mode: FetchMode) -> Result<RawResultSet, SearchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_sentinel_detection() {
        assert!(RawResultSet::empty_sentinel().is_empty_result());
        assert!(RawResultSet::default().is_empty_result());

        let entry = json!({"dc:title": "A paper"}).as_object().cloned().unwrap();
        assert!(!RawResultSet::new(vec![entry]).is_empty_result());
    }

    #[test]
    fn test_fetch_mode_defaults() {
        assert_eq!(FetchMode::default(), FetchMode::Page { count: 10 });
        assert_eq!(FetchMode::All { page_size: 25 }.page_size(), 25);
    }
}
