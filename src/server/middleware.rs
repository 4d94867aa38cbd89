//! Access Log Middleware
//!
//! Request timing, per-route counters and the access log

use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Requests slower than this are logged at warn
const SLOW_REQUEST_MS: f64 = 1000.0;

/// Counters for one route template
#[derive(Debug, Default, Clone)]
pub struct RouteStats {
    pub requests: u64,
    /// 4xx responses (validation, unknown job)
    pub client_errors: u64,
    /// 5xx responses (inference, refresh, training faults)
    pub server_errors: u64,
    pub total_ms: f64,
}

impl RouteStats {
    fn record(&mut self, status: StatusCode, duration_ms: f64) {
        self.requests += 1;
        self.total_ms += duration_ms;
        if status.is_client_error() {
            self.client_errors += 1;
        } else if status.is_server_error() {
            self.server_errors += 1;
        }
    }

    pub fn avg_ms(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.total_ms / self.requests as f64
        }
    }
}

/// Server metrics, keyed by route template (`/train/:id`, not the job id)
#[derive(Debug, Default, Clone)]
pub struct ServerMetrics {
    pub routes: HashMap<String, RouteStats>,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&mut self, route: &str, status: StatusCode, duration_ms: f64) {
        self.routes
            .entry(route.to_string())
            .or_default()
            .record(status, duration_ms);
    }

    pub fn route(&self, route: &str) -> Option<&RouteStats> {
        self.routes.get(route)
    }

    pub fn summary(&self) -> MetricsSummary {
        let total = self.routes.values().fold(RouteStats::default(), |mut acc, s| {
            acc.requests += s.requests;
            acc.client_errors += s.client_errors;
            acc.server_errors += s.server_errors;
            acc.total_ms += s.total_ms;
            acc
        });
        let failed = total.client_errors + total.server_errors;

        MetricsSummary {
            total_requests: total.requests,
            successful_requests: total.requests - failed,
            client_errors: total.client_errors,
            server_errors: total.server_errors,
            avg_processing_time_ms: total.avg_ms(),
            success_rate: if total.requests > 0 {
                (total.requests - failed) as f64 / total.requests as f64 * 100.0
            } else {
                0.0
            },
        }
    }
}

/// Metrics summary
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    pub avg_processing_time_ms: f64,
    pub success_rate: f64,
}

/// Shared metrics plus the access-log switch
pub struct MetricsState {
    metrics: RwLock<ServerMetrics>,
    access_log: bool,
}

impl MetricsState {
    pub fn new(access_log: bool) -> Self {
        Self {
            metrics: RwLock::new(ServerMetrics::new()),
            access_log,
        }
    }

    pub async fn record_request(&self, route: &str, status: StatusCode, duration_ms: f64) {
        self.metrics.write().await.record_request(route, status, duration_ms);
    }

    pub async fn get_summary(&self) -> MetricsSummary {
        self.metrics.read().await.summary()
    }
}

/// Access log and metrics middleware
pub async fn access_log(
    State(metrics): State<Arc<MetricsState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let query = req
        .uri()
        .query()
        .map(|q| urlencoding::decode(q).map(|d| d.into_owned()).unwrap_or_else(|_| q.to_string()))
        .unwrap_or_default();
    let method = req.method().clone();
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let start = Instant::now();

    let response = next.run(req).await;

    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    let status = response.status();
    metrics.record_request(&route, status, duration_ms).await;

    if duration_ms > SLOW_REQUEST_MS {
        warn!(
            "Slow request: {} {} {} from {} took {:.2}ms (status: {})",
            method, path, query, client, duration_ms, status
        );
    } else if metrics.access_log {
        info!("{} {} {} from {} {:.2}ms {}", method, path, query, client, duration_ms, status);
    }

    response
}
