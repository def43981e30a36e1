//! Aggregation Store
//!
//! Shared, append-only table of normalized rows plus the run log. Every
//! `reset` advances an epoch; appends made on behalf of an older epoch are
//! dropped so a cleared store stays clean even if stale work finishes late.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::events::LogLine;
use crate::normalize::ResultRecord;

#[derive(Debug, Default)]
struct StoreState {
    rows: Vec<ResultRecord>,
    log: Vec<LogLine>,
    epoch: u64,
}

#[derive(Clone, Default)]
pub struct AggregationStore {
    inner: Arc<RwLock<StoreState>>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows, returning the new row count.
    ///
    /// Rows without a source query are rejected.
    pub async fn append(&self, rows: Vec<ResultRecord>) -> usize {
        let mut guard = self.inner.write().await;
        Self::extend(&mut guard, rows)
    }

    /// Append only while `epoch` is still current. Returns `None` when the
    /// store was reset since.
    pub async fn append_in_epoch(&self, epoch: u64, rows: Vec<ResultRecord>) -> Option<usize> {
        let mut guard = self.inner.write().await;
        if guard.epoch != epoch {
            debug!(stale = epoch, current = guard.epoch, "Dropping rows from a reset run");
            return None;
        }
        Some(Self::extend(&mut guard, rows))
    }

    fn extend(state: &mut StoreState, rows: Vec<ResultRecord>) -> usize {
        let offered = rows.len();
        let before = state.rows.len();
        state
            .rows
            .extend(rows.into_iter().filter(|row| !row.source_query.is_empty()));
        let rejected = offered - (state.rows.len() - before);
        if rejected > 0 {
            warn!(rejected, "Rejected rows without a source query");
        }
        state.rows.len()
    }

    pub async fn snapshot(&self) -> Vec<ResultRecord> {
        self.inner.read().await.rows.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.rows.is_empty()
    }

    pub async fn push_log(&self, line: LogLine) {
        self.inner.write().await.log.push(line);
    }

    pub async fn push_log_in_epoch(&self, epoch: u64, line: LogLine) -> bool {
        let mut guard = self.inner.write().await;
        if guard.epoch != epoch {
            return false;
        }
        guard.log.push(line);
        true
    }

    pub async fn log(&self) -> Vec<LogLine> {
        self.inner.read().await.log.clone()
    }

    /// Rows and log lines read under one lock
    pub async fn snapshot_with_log(&self) -> (Vec<ResultRecord>, Vec<LogLine>) {
        let guard = self.inner.read().await;
        (guard.rows.clone(), guard.log.clone())
    }

    pub async fn epoch(&self) -> u64 {
        self.inner.read().await.epoch
    }

    /// Discard all rows and log lines, returning the new epoch
    pub async fn reset(&self) -> u64 {
        let mut guard = self.inner.write().await;
        guard.rows.clear();
        guard.log.clear();
        guard.epoch += 1;
        guard.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RunEvent;

    fn row(query: &str, title: &str) -> ResultRecord {
        ResultRecord {
            identifier: None,
            authors: None,
            journal: None,
            title: Some(title.to_string()),
            publication_date: None,
            publication_year: None,
            doi_url: None,
            source_query: query.to_string(),
        }
    }

    #[tokio::test]
    async fn test_append_and_snapshot() {
        let store = AggregationStore::new();
        assert!(store.is_empty().await);

        assert_eq!(store.append(vec![row("q1", "a"), row("q1", "b")]).await, 2);
        assert_eq!(store.append(vec![row("q2", "a")]).await, 3);

        let rows = store.snapshot().await;
        assert_eq!(rows.len(), 3);
        // Overlapping queries are not deduplicated.
        assert_eq!(rows.iter().filter(|r| r.title.as_deref() == Some("a")).count(), 2);
    }

    #[tokio::test]
    async fn test_rows_without_query_are_rejected() {
        let store = AggregationStore::new();
        assert_eq!(store.append(vec![row("", "a"), row("q", "b")]).await, 1);
        assert!(store.snapshot().await.iter().all(|r| !r.source_query.is_empty()));
    }

    #[tokio::test]
    async fn test_reset_clears_rows_and_log() {
        let store = AggregationStore::new();
        store.append(vec![row("q", "a")]).await;
        store
            .push_log(LogLine::from(&RunEvent::Submitted { query: "q".to_string() }))
            .await;

        let epoch = store.reset().await;
        assert_eq!(epoch, 1);
        assert!(store.is_empty().await);
        assert!(store.log().await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_epoch_is_dropped() {
        let store = AggregationStore::new();
        let epoch = store.epoch().await;
        store.reset().await;

        assert_eq!(store.append_in_epoch(epoch, vec![row("q", "a")]).await, None);
        assert!(!store
            .push_log_in_epoch(epoch, LogLine::from(&RunEvent::Empty { query: "q".to_string() }))
            .await);
        assert!(store.is_empty().await);
        assert!(store.log().await.is_empty());

        let current = store.epoch().await;
        assert_eq!(store.append_in_epoch(current, vec![row("q", "a")]).await, Some(1));
    }

    #[tokio::test]
    async fn test_snapshot_with_log_reads_both() {
        let store = AggregationStore::new();
        store.append(vec![row("q", "a"), row("q", "b")]).await;
        store
            .push_log(LogLine::from(&RunEvent::Completed {
                query: "q".to_string(),
                rows: 2,
            }))
            .await;

        let (rows, log) = store.snapshot_with_log().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].message, "Found 2 results for query: q");
    }

    #[tokio::test]
    async fn test_concurrent_appends_lose_nothing() {
        let store = AggregationStore::new();
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let query = format!("q{}", i);
                store.append(vec![row(&query, "a"), row(&query, "b")]).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.len().await, 40);
    }
}
