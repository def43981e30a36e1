use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::export::{sanitize_filename, to_csv_bytes, DEFAULT_CSV_NAME};
use crate::models::AppState;
use crate::types::{AppError, AppResult, RunRequest, RunSnapshot, RunStarted};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/runs", post(start_run))
        .route("/api/runs/current", get(current_run))
        .route("/api/runs/reset", post(reset_run))
        .route("/api/runs/export", get(export_run))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub filename: Option<String>,
}

async fn start_run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> AppResult<(StatusCode, Json<RunStarted>)> {
    request.validate()?;
    let plan = request.to_plan(&state.config.scopus);
    info!(queries = plan.len(), "Run requested");

    let started = state.session.start(plan).await?;
    Ok((StatusCode::ACCEPTED, Json(started)))
}

async fn current_run(State(state): State<AppState>) -> Json<RunSnapshot> {
    Json(state.session.snapshot().await)
}

async fn reset_run(State(state): State<AppState>) -> StatusCode {
    state.session.reset().await;
    StatusCode::NO_CONTENT
}

async fn export_run(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> AppResult<Response> {
    let rows = state.session.store().snapshot().await;
    if rows.is_empty() {
        return Err(AppError::NotFound("no results to export".to_string()));
    }

    let filename = sanitize_filename(params.filename.as_deref().unwrap_or(DEFAULT_CSV_NAME));
    let data = to_csv_bytes(&rows).map_err(|e| AppError::Internal(e.to_string()))?;
    info!(rows = rows.len(), %filename, "Exporting results");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        data,
    )
        .into_response())
}
