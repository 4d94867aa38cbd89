//! Health Check Route

use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use crate::server::server_core::ServerState;
use crate::server::types::HealthResponse;

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    let stats = state.cache().stats();
    let summary = state.metrics.get_summary().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.uptime().as_secs(),
        model_count: stats.models,
        loaded_models: stats.loaded,
        generation: stats.generation,
        training_jobs: state.trainer.jobs().len(),
        requests: summary.into(),
    })
}
