//! Voice Server Module
//!
//! HTTP surface of the multi-model voice service:
//! - `/voice` synthesis with model/speaker/style resolution
//! - `/models/info`, `/models/refresh` for the servable generation
//! - `/train` submissions and job status
//! - `/status`, `/health` and the access log

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server_core;
pub mod types;

pub use config::{LoggingConfig, ServerConfig};
pub use error::ApiError;
pub use middleware::{MetricsState, MetricsSummary, RouteStats, ServerMetrics};
pub use server_core::{create_router, ServerState, TtsServer};
pub use types::*;
