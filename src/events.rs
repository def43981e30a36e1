//! Run Events
//!
//! Progress of a run is reported as [`RunEvent`]s through the [`RunLog`]
//! sink trait, so the executor never writes to a terminal or a UI directly.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::SearchCombination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Something that happened during a run
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Started { total_queries: usize },
    Submitted { query: String },
    Completed { query: String, rows: usize },
    Empty { query: String },
    Failed { combination: SearchCombination, error: String },
    Finished { elapsed: Duration, total_rows: usize },
}

impl RunEvent {
    pub fn level(&self) -> LogLevel {
        match self {
            RunEvent::Failed { .. } => LogLevel::Error,
            RunEvent::Empty { .. } => LogLevel::Warn,
            _ => LogLevel::Info,
        }
    }

    /// Human readable log line
    pub fn render(&self) -> String {
        match self {
            RunEvent::Started { total_queries } => format!("Total number of queries: {}", total_queries),
            RunEvent::Submitted { query } => format!("Executing search for query: {}", query),
            RunEvent::Completed { query, rows } => format!("Found {} results for query: {}", rows, query),
            RunEvent::Empty { query } => format!("No results found for query: {}", query),
            RunEvent::Failed { combination, error } => {
                format!("Combination {} generated an exception: {}", combination, error)
            }
            RunEvent::Finished { elapsed, total_rows } => format!(
                "Total time taken for all queries: {:.2} seconds. Total count of papers: {}",
                elapsed.as_secs_f64(),
                total_rows
            ),
        }
    }
}

/// One rendered line of the run log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl From<&RunEvent> for LogLine {
    fn from(event: &RunEvent) -> Self {
        Self {
            at: Utc::now(),
            level: event.level(),
            message: event.render(),
        }
    }
}

/// Sink for the live log stream of a run
#[async_trait]
pub trait RunLog: Send + Sync {
    async fn record(&self, event: &RunEvent);
}

/// Prints every event as it arrives; used by the CLI
pub struct ConsoleLog;

#[async_trait]
impl RunLog for ConsoleLog {
    async fn record(&self, event: &RunEvent) {
        match event.level() {
            LogLevel::Info => println!("{}", event.render()),
            LogLevel::Warn | LogLevel::Error => eprintln!("{}", event.render()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lines() {
        let failed = RunEvent::Failed {
            combination: SearchCombination::new("a", "b", "c"),
            error: "boom".to_string(),
        };
        assert_eq!(failed.render(), "Combination (a, b, c) generated an exception: boom");
        assert_eq!(failed.level(), LogLevel::Error);

        let finished = RunEvent::Finished {
            elapsed: Duration::from_millis(1500),
            total_rows: 7,
        };
        assert_eq!(
            finished.render(),
            "Total time taken for all queries: 1.50 seconds. Total count of papers: 7"
        );

        let line = LogLine::from(&RunEvent::Empty { query: "q".to_string() });
        assert_eq!(line.level, LogLevel::Warn);
        assert_eq!(line.message, "No results found for query: q");
    }
}
