use axum::{extract::State, routing::get, Json, Router};

use crate::models::AppState;
use crate::types::HealthResponse;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        scopus_configured: !state.config.scopus.api_key.trim().is_empty(),
    })
}
