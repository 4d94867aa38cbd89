//! Model Management Routes

use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::info;

use crate::model::Generation;
use crate::server::error::ApiError;
use crate::server::server_core::ServerState;
use crate::server::types::{ModelInfoEntry, ModelsInfo};

/// Listing of a generation keyed by model id
pub fn describe(generation: &Generation) -> ModelsInfo {
    generation
        .bundles()
        .iter()
        .map(|bundle| (bundle.index().to_string(), ModelInfoEntry::from(bundle.as_ref())))
        .collect()
}

/// `GET /models/info`
pub async fn models_info(State(state): State<Arc<ServerState>>) -> Json<ModelsInfo> {
    Json(describe(&state.cache().snapshot()))
}

/// `POST /models/refresh`: rescan and return the new listing
pub async fn refresh(State(state): State<Arc<ServerState>>) -> Result<Json<ModelsInfo>, ApiError> {
    let generation = state.refresh_models()?;
    info!("Models refreshed: {} available", generation.len());
    Ok(Json(describe(&generation)))
}
