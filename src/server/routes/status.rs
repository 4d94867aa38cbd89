//! Host Status Route

use std::sync::Arc;

use axum::{extract::State, Json};
use sysinfo::System;
use tracing::warn;

use crate::server::server_core::ServerState;
use crate::server::types::StatusResponse;

/// `GET /status`: devices, CPU, memory and GPU utilization
pub async fn status(State(state): State<Arc<ServerState>>) -> Json<StatusResponse> {
    let mut sys = System::new();
    sys.refresh_memory();
    // CPU usage is a delta between two refreshes
    sys.refresh_cpu_usage();
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
    sys.refresh_cpu_usage();

    let memory_total = sys.total_memory();
    let memory_available = sys.available_memory();
    let memory_used = sys.used_memory();
    let memory_percent = if memory_total > 0 {
        (memory_total - memory_available) as f64 / memory_total as f64 * 100.0
    } else {
        0.0
    };

    let inventory = match state.cache().loader().devices().await {
        Ok(inventory) => inventory,
        Err(e) => {
            warn!("Failed to query inference devices: {}", e);
            Default::default()
        }
    };

    let mut devices = vec!["cpu".to_string()];
    devices.extend(inventory.devices.into_iter().filter(|d| d != "cpu"));

    Json(StatusResponse {
        devices,
        cpu_percent: sys.global_cpu_usage(),
        memory_total,
        memory_available,
        memory_used,
        memory_percent,
        gpu: inventory.gpus,
    })
}
