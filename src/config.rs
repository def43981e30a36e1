use anyhow::Result;
use serde::Deserialize;
use std::env;

use crate::search::scopus::DEFAULT_BASE_URL;
use crate::search::FetchMode;

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_PAPERS_PER_SEARCH: u32 = 10;
/// Largest page Scopus serves for the standard view
pub const MAX_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub scopus: ScopusConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScopusConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: Option<u64>,
    pub workers: usize,
    pub papers_per_search: u32,
    pub fetch_all: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: Option<String>,
    pub log_dir: Option<String>,
}

impl ScopusConfig {
    /// Fetch mode implied by `papers_per_search` and `fetch_all`
    pub fn fetch_mode(&self) -> FetchMode {
        if self.fetch_all {
            FetchMode::All {
                page_size: self.papers_per_search.clamp(1, MAX_PAGE_SIZE),
            }
        } else {
            FetchMode::Page {
                count: self.papers_per_search.max(1),
            }
        }
    }
}

impl Default for ScopusConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
            workers: DEFAULT_WORKERS,
            papers_per_search: DEFAULT_PAPERS_PER_SEARCH,
            fetch_all: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            scopus: ScopusConfig {
                api_key: env::var("SCOPUS_API_KEY").unwrap_or_default(),
                base_url: env::var("SCOPUS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
                timeout_secs: match env::var("SCOPUS_TIMEOUT_SECS") {
                    Ok(v) if !v.trim().is_empty() => Some(v.trim().parse()?),
                    _ => None,
                },
                workers: env::var("SEARCH_WORKERS")
                    .unwrap_or_else(|_| DEFAULT_WORKERS.to_string())
                    .parse::<usize>()?
                    .max(1),
                papers_per_search: env::var("PAPERS_PER_SEARCH")
                    .unwrap_or_else(|_| DEFAULT_PAPERS_PER_SEARCH.to_string())
                    .parse()?,
                fetch_all: env::var("FETCH_ALL")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()?,
            },
            logging: LoggingConfig {
                filter: env::var("RUST_LOG").ok(),
                log_dir: env::var("LOG_DIR").ok().filter(|d| !d.trim().is_empty()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_mode_from_config() {
        let mut config = ScopusConfig::default();
        assert_eq!(config.fetch_mode(), FetchMode::Page { count: 10 });

        config.papers_per_search = 0;
        assert_eq!(config.fetch_mode(), FetchMode::Page { count: 1 });

        config.fetch_all = true;
        config.papers_per_search = 100;
        assert_eq!(config.fetch_mode(), FetchMode::All { page_size: MAX_PAGE_SIZE });
    }

    #[test]
    fn test_scopus_defaults() {
        let config = ScopusConfig::default();
        assert_eq!(config.workers, 5);
        assert_eq!(config.base_url, "https://api.elsevier.com");
        assert!(config.timeout_secs.is_none());
    }
}
