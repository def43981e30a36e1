// Logger initialization

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

pub const DEFAULT_FILTER: &str = "scopus_sweep=info,tower_http=info";
pub const LOG_FILE_PREFIX: &str = "scopus-sweep.log";

/// Filter from `RUST_LOG`, then the configured filter, then the default
pub fn env_filter(config: &LoggingConfig, debug: bool) -> EnvFilter {
    if debug {
        return EnvFilter::new("scopus_sweep=debug,tower_http=debug");
    }
    EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| config.filter.as_deref().and_then(|f| EnvFilter::try_new(f).ok()))
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Keep the returned guard alive so the
/// daily log file is flushed on exit.
pub fn init_logger(config: &LoggingConfig, debug: bool) -> Option<WorkerGuard> {
    let filter = env_filter(config, debug);

    match config.log_dir.as_deref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .ok();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .ok();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_debug_filter_wins() {
        let config = LoggingConfig {
            filter: Some("warn".to_string()),
            log_dir: None,
        };
        let filter = env_filter(&config, true).to_string();
        assert!(filter.contains("scopus_sweep=debug"));
        assert!(!filter.contains("warn"));
    }

    #[test]
    fn test_file_logging_returns_guard() {
        let temp_dir = TempDir::new().unwrap();
        let config = LoggingConfig {
            filter: None,
            log_dir: Some(temp_dir.path().to_string_lossy().to_string()),
        };
        let guard = init_logger(&config, false);
        assert!(guard.is_some());
    }
}
