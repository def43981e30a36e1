// Shared request/response types and the HTTP-facing error

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::ScopusConfig;
use crate::events::LogLine;
use crate::executor::{RunPlan, RunSummary};
use crate::normalize::ResultRecord;
use crate::query::{DocumentType, QueryFilterSet};

/// Body of `POST /api/runs`, mirroring the search form
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RunRequest {
    /// Comma separated first sub-keywords
    #[validate(length(min = 1))]
    pub first_terms: String,
    #[validate(length(min = 1))]
    pub second_terms: String,
    #[validate(length(min = 1))]
    pub third_terms: String,
    #[serde(default)]
    pub document_types: Vec<DocumentType>,
    /// `2020` or `2015-2024`
    #[serde(default)]
    pub publication_year: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 5000))]
    pub papers_per_search: Option<u32>,
    #[serde(default)]
    pub fetch_all: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStarted {
    pub run_id: uuid::Uuid,
    pub total_queries: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Finished,
}

/// Body of `GET /api/runs/current`
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub run_id: Option<uuid::Uuid>,
    pub status: RunStatus,
    pub total_rows: usize,
    pub rows: Vec<ResultRecord>,
    pub log: Vec<LogLine>,
    pub summary: Option<RunSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub scopus_configured: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("A run is already in progress")]
    RunInProgress,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidRequest(err.to_string())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RunInProgress => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl RunRequest {
    /// Expand the form into a run plan, falling back to `defaults` for paging
    pub fn to_plan(&self, defaults: &ScopusConfig) -> RunPlan {
        let filters = QueryFilterSet::new(
            self.document_types.clone(),
            self.publication_year.as_deref(),
            self.author_name.as_deref(),
        );
        let paging = ScopusConfig {
            papers_per_search: self.papers_per_search.unwrap_or(defaults.papers_per_search),
            fetch_all: self.fetch_all.unwrap_or(defaults.fetch_all),
            ..defaults.clone()
        };
        RunPlan::from_term_lists(
            &self.first_terms,
            &self.second_terms,
            &self.third_terms,
            filters,
            paging.fetch_mode(),
        )
    }
}
