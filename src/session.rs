//! Search Session
//!
//! Owns the aggregation store and at most one active run. Starting a run
//! clears the previous table; resetting aborts the active run before clearing.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::executor::{FanOutExecutor, RunContext, RunPlan, RunSummary};
use crate::store::AggregationStore;
use crate::types::{AppError, AppResult, RunSnapshot, RunStarted, RunStatus};

#[derive(Default)]
struct RunState {
    run_id: Option<Uuid>,
    handle: Option<JoinHandle<()>>,
    summary: Option<RunSummary>,
}

impl RunState {
    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

#[derive(Clone)]
pub struct Session {
    store: AggregationStore,
    executor: Arc<FanOutExecutor>,
    state: Arc<Mutex<RunState>>,
}

impl Session {
    pub fn new(executor: Arc<FanOutExecutor>) -> Self {
        Self {
            store: AggregationStore::new(),
            executor,
            state: Arc::new(Mutex::new(RunState::default())),
        }
    }

    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    /// Clear the table and start `plan` in the background
    pub async fn start(&self, plan: RunPlan) -> AppResult<RunStarted> {
        if plan.is_empty() {
            return Err(AppError::InvalidRequest(
                "each sub-keyword list needs at least one term".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        if state.is_running() {
            return Err(AppError::RunInProgress);
        }

        let ctx = RunContext::fresh(self.store.clone()).await;
        let run_id = Uuid::new_v4();
        let total_queries = plan.len();
        state.run_id = Some(run_id);
        state.summary = None;

        let executor = Arc::clone(&self.executor);
        let shared = Arc::clone(&self.state);
        state.handle = Some(tokio::spawn(async move {
            let summary = executor.run(&plan, &ctx).await;
            let mut state = shared.lock().await;
            if state.run_id == Some(run_id) {
                state.summary = Some(summary);
            }
        }));

        info!(%run_id, total_queries, "Run started");
        Ok(RunStarted { run_id, total_queries })
    }

    /// Abort any active run and clear rows and log
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        if let Some(handle) = state.handle.take() {
            if !handle.is_finished() {
                warn!(run_id = ?state.run_id, "Aborting active run on reset");
            }
            handle.abort();
        }
        state.run_id = None;
        state.summary = None;
        self.store.reset().await;
        info!("Session reset");
    }

    pub async fn snapshot(&self) -> RunSnapshot {
        let state = self.state.lock().await;
        let status = if state.is_running() {
            RunStatus::Running
        } else if state.run_id.is_some() {
            RunStatus::Finished
        } else {
            RunStatus::Idle
        };
        let (rows, log) = self.store.snapshot_with_log().await;

        RunSnapshot {
            run_id: state.run_id,
            status,
            total_rows: rows.len(),
            rows,
            log,
            summary: state.summary.clone(),
        }
    }

    /// Wait for the active run, if any, to finish
    pub async fn wait(&self) -> Option<RunSummary> {
        let handle = self.state.lock().await.handle.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Run task failed");
                }
            }
        }
        self.state.lock().await.summary.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryFilterSet;
    use crate::search::{FetchMode, RawResultSet, SearchBackend, SearchError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct SlowBackend {
        delay: Duration,
    }

    #[async_trait]
    impl SearchBackend for SlowBackend {
        async fn search(&self, query: &str, _mode: FetchMode) -> Result<RawResultSet, SearchError> {
            tokio::time::sleep(self.delay).await;
            let entry = json!({"dc:title": query}).as_object().cloned().unwrap();
            Ok(RawResultSet::new(vec![entry]))
        }
    }

    fn session(delay_ms: u64) -> Session {
        let backend = Arc::new(SlowBackend {
            delay: Duration::from_millis(delay_ms),
        });
        Session::new(Arc::new(FanOutExecutor::new(backend)))
    }

    fn plan(first: &str) -> RunPlan {
        RunPlan::from_term_lists(first, "b", "c", QueryFilterSet::default(), FetchMode::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_to_completion() {
        let session = session(10);
        let started = session.start(plan("a1,a2,a3")).await.unwrap();
        assert_eq!(started.total_queries, 3);

        let summary = session.wait().await.unwrap();
        assert_eq!(summary.total_rows, 3);

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.status, RunStatus::Finished);
        assert_eq!(snapshot.run_id, Some(started.run_id));
        assert_eq!(snapshot.rows.len(), 3);
        assert!(!snapshot.log.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_run_replaces_previous_table() {
        let session = session(10);
        session.start(plan("a1,a2")).await.unwrap();
        session.wait().await;
        session.start(plan("z")).await.unwrap();
        session.wait().await;

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.total_rows, 1);
        assert_eq!(snapshot.rows[0].source_query, "TITLE-ABS-KEY(z AND b AND c)");
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_while_running_conflicts() {
        let session = session(1_000);
        session.start(plan("a")).await.unwrap();
        let err = session.start(plan("b")).await.unwrap_err();
        assert!(matches!(err, AppError::RunInProgress));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_state_and_aborts_run() {
        let session = session(1_000);
        session.start(plan("a,b,c,d,e,f")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        session.reset().await;
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.status, RunStatus::Idle);
        assert!(snapshot.rows.is_empty());
        assert!(snapshot.log.is_empty());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(session.store().is_empty().await);
        assert!(session.store().log().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_plan_is_rejected() {
        let session = session(1);
        let err = session.start(plan(" , ")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }
}
