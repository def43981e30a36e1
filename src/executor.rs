//! Fan-Out Executor
//!
//! Runs every combination of a [`RunPlan`] as an independent unit of work
//! (build query, call the search backend, normalize) with at most `workers`
//! units in flight. Completions are drained in whatever order they finish and
//! merged into the [`AggregationStore`] immediately. A failing unit is logged
//! and contributes zero rows; it never aborts its siblings.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::DEFAULT_WORKERS;
use crate::events::{LogLine, RunEvent, RunLog};
use crate::normalize::{normalize, ResultRecord};
use crate::query::{build_query, combinations, parse_terms, QueryFilterSet, SearchCombination};
use crate::search::{FetchMode, SearchBackend, SearchError};
use crate::store::AggregationStore;

/// Everything needed to execute one run
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub combinations: Vec<SearchCombination>,
    pub filters: QueryFilterSet,
    pub fetch_mode: FetchMode,
}

impl RunPlan {
    pub fn new(combinations: Vec<SearchCombination>, filters: QueryFilterSet, fetch_mode: FetchMode) -> Self {
        Self {
            combinations,
            filters,
            fetch_mode,
        }
    }

    /// Plan from three comma separated term lists
    pub fn from_term_lists(
        first: &str,
        second: &str,
        third: &str,
        filters: QueryFilterSet,
        fetch_mode: FetchMode,
    ) -> Self {
        let combos = combinations(&parse_terms(first), &parse_terms(second), &parse_terms(third));
        Self::new(combos, filters, fetch_mode)
    }

    /// Query strings in submission order
    pub fn queries(&self) -> Vec<String> {
        self.combinations
            .iter()
            .map(|combination| build_query(combination, &self.filters))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }
}

/// The store a run writes into, the epoch it belongs to and any extra log sinks
#[derive(Clone)]
pub struct RunContext {
    store: AggregationStore,
    epoch: u64,
    sinks: Vec<Arc<dyn RunLog>>,
}

impl RunContext {
    /// Attach to the store's current epoch without clearing it
    pub async fn begin(store: AggregationStore) -> Self {
        let epoch = store.epoch().await;
        Self {
            store,
            epoch,
            sinks: Vec::new(),
        }
    }

    /// Clear the store and attach to the new epoch
    pub async fn fresh(store: AggregationStore) -> Self {
        let epoch = store.reset().await;
        Self {
            store,
            epoch,
            sinks: Vec::new(),
        }
    }

    pub fn with_log(mut self, sink: Arc<dyn RunLog>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    async fn is_stale(&self) -> bool {
        self.store.epoch().await != self.epoch
    }

    async fn emit(&self, event: RunEvent) {
        self.store
            .push_log_in_epoch(self.epoch, LogLine::from(&event))
            .await;
        for sink in &self.sinks {
            sink.record(&event).await;
        }
    }
}

/// Outcome counters of a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_queries: usize,
    pub succeeded: usize,
    pub empty: usize,
    pub failed: usize,
    pub rows_added: usize,
    pub total_rows: usize,
    pub elapsed_secs: f64,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_secs)
    }
}

#[derive(Debug, Error)]
enum UnitError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("search task panicked: {0}")]
    Panicked(String),

    #[error("worker pool closed")]
    PoolClosed,
}

struct UnitOutcome {
    combination: SearchCombination,
    query: String,
    result: Result<Vec<ResultRecord>, UnitError>,
}

/// Bounded fan-out over a search backend
pub struct FanOutExecutor {
    backend: Arc<dyn SearchBackend>,
    workers: usize,
}

impl FanOutExecutor {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self::with_workers(backend, DEFAULT_WORKERS)
    }

    pub fn with_workers(backend: Arc<dyn SearchBackend>, workers: usize) -> Self {
        Self {
            backend,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Execute every combination of `plan`, merging rows into `ctx`'s store.
    ///
    /// Individual failures are contained; the run itself never fails. If the
    /// store is reset mid-run the remaining units are aborted.
    pub async fn run(&self, plan: &RunPlan, ctx: &RunContext) -> RunSummary {
        let started = Instant::now();
        let total_queries = plan.len();
        info!(total_queries, workers = self.workers, mode = ?plan.fetch_mode, "Starting fan-out run");
        ctx.emit(RunEvent::Started { total_queries }).await;

        let permits = Arc::new(Semaphore::new(self.workers));
        let filters = Arc::new(plan.filters.clone());
        let mut units = JoinSet::new();
        let mut pending = HashMap::new();

        for combination in plan.combinations.iter().cloned() {
            let backend = Arc::clone(&self.backend);
            let permits = Arc::clone(&permits);
            let filters = Arc::clone(&filters);
            let unit_ctx = ctx.clone();
            let mode = plan.fetch_mode;
            let tracked = combination.clone();

            let handle = units.spawn(async move {
                let query = build_query(&combination, &filters);
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => {
                        unit_ctx
                            .emit(RunEvent::Submitted { query: query.clone() })
                            .await;
                        execute_unit(backend.as_ref(), &query, mode).await
                    }
                    Err(_) => Err(UnitError::PoolClosed),
                };
                UnitOutcome {
                    combination,
                    query,
                    result,
                }
            });
            pending.insert(handle.id(), tracked);
        }

        let mut summary = RunSummary {
            total_queries,
            succeeded: 0,
            empty: 0,
            failed: 0,
            rows_added: 0,
            total_rows: 0,
            elapsed_secs: 0.0,
            cancelled: false,
        };

        while let Some(joined) = units.join_next_with_id().await {
            let outcome = match joined {
                Ok((id, outcome)) => {
                    pending.remove(&id);
                    outcome
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(error = %e, "Search unit ended unexpectedly");
                    if let Some(combination) = pending.remove(&e.id()) {
                        ctx.emit(RunEvent::Failed {
                            combination,
                            error: format!("search task ended unexpectedly: {}", e),
                        })
                        .await;
                    }
                    continue;
                }
            };

            match outcome.result {
                Ok(rows) if rows.is_empty() => {
                    summary.empty += 1;
                    debug!(query = %outcome.query, "No results");
                    ctx.emit(RunEvent::Empty { query: outcome.query }).await;
                }
                Ok(rows) => {
                    let count = rows.len();
                    match ctx.store.append_in_epoch(ctx.epoch, rows).await {
                        Some(total) => {
                            summary.succeeded += 1;
                            summary.rows_added += count;
                            info!(query = %outcome.query, rows = count, total_rows = total, "Merged results");
                            ctx.emit(RunEvent::Completed {
                                query: outcome.query,
                                rows: count,
                            })
                            .await;
                        }
                        None => {
                            summary.cancelled = true;
                            break;
                        }
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(combination = %outcome.combination, query = %outcome.query, error = %e, "Search unit failed");
                    ctx.emit(RunEvent::Failed {
                        combination: outcome.combination,
                        error: e.to_string(),
                    })
                    .await;
                }
            }

            if ctx.is_stale().await {
                summary.cancelled = true;
                break;
            }
        }

        if summary.cancelled {
            units.abort_all();
            warn!(
                completed = summary.succeeded + summary.empty + summary.failed,
                total_queries,
                "Run abandoned after the store was reset"
            );
        }

        let elapsed = started.elapsed();
        summary.elapsed_secs = elapsed.as_secs_f64();
        summary.total_rows = ctx.store.len().await;

        if !summary.cancelled {
            ctx.emit(RunEvent::Finished {
                elapsed,
                total_rows: summary.total_rows,
            })
            .await;
        }

        info!(
            succeeded = summary.succeeded,
            empty = summary.empty,
            failed = summary.failed,
            total_rows = summary.total_rows,
            elapsed_secs = summary.elapsed_secs,
            "Fan-out run finished"
        );
        summary
    }
}

async fn execute_unit(
    backend: &dyn SearchBackend,
    query: &str,
    mode: FetchMode,
) -> Result<Vec<ResultRecord>, UnitError> {
    match AssertUnwindSafe(backend.search(query, mode)).catch_unwind().await {
        Ok(Ok(raw)) => Ok(normalize(&raw, query)),
        Ok(Err(e)) => Err(UnitError::Search(e)),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(UnitError::Panicked(message))
        }
    }
}
