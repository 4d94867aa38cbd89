//! Voice Server Core
//!
//! Shared state, router assembly and the listener loop

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::core::error::{Result, TtsError};
use crate::engine::ModelLoader;
use crate::model::{Generation, ModelCache, ModelRegistry};
use crate::server::config::ServerConfig;
use crate::server::middleware::{access_log, MetricsState};
use crate::server::routes;
use crate::synthesis::SynthesisPipeline;
use crate::training::{ProcessLauncher, TrainingJobLauncher};

/// Upload ceiling for `/train`
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Server state shared across handlers
pub struct ServerState {
    /// Server configuration
    pub config: ServerConfig,
    /// On-disk bundle discovery
    pub registry: ModelRegistry,
    /// Resolution, lazy loading and inference
    pub pipeline: SynthesisPipeline,
    /// Training submissions
    pub trainer: TrainingJobLauncher,
    /// Request metrics
    pub metrics: Arc<MetricsState>,
    /// Start time for uptime calculation
    pub start_time: Instant,
}

impl ServerState {
    /// Create server state with an empty model generation
    pub fn new(
        config: ServerConfig,
        loader: Arc<dyn ModelLoader>,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        let cache = Arc::new(ModelCache::new(loader, config.device));
        let pipeline = SynthesisPipeline::new(cache, config.max_concurrent_inference);

        Self {
            registry: ModelRegistry::new(&config.assets_root),
            pipeline,
            trainer: TrainingJobLauncher::new(config.training.clone(), launcher),
            metrics: Arc::new(MetricsState::new(config.logging.access_log)),
            start_time: Instant::now(),
            config,
        }
    }

    pub fn cache(&self) -> &Arc<ModelCache> {
        self.pipeline.cache()
    }

    /// Rescan the assets root and swap in a new generation.
    /// A failed scan leaves the current generation in place.
    pub fn refresh_models(&self) -> Result<Arc<Generation>> {
        self.cache().refresh_from(&self.registry)
    }

    /// Initial scan. Zero models is an error.
    pub fn bootstrap(&self) -> Result<Arc<Generation>> {
        let generation = self.refresh_models()?;
        if generation.is_empty() {
            return Err(TtsError::Registry {
                message: format!("Models not found in {:?}", self.registry.root()),
                path: Some(self.registry.root().to_path_buf()),
            });
        }

        for bundle in generation.bundles() {
            info!("Model {}: {} ({:?})", bundle.index(), bundle.name(), bundle.paths().weights);
        }
        Ok(generation)
    }

    /// Get server uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Create the router with all routes
pub fn create_router(state: Arc<ServerState>) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let router = Router::new()
        // Synthesis
        .route("/voice", get(routes::voice::voice).post(routes::voice::voice))

        // Model management
        .route("/models/info", get(routes::models::models_info))
        .route("/models/refresh", post(routes::models::refresh))

        // Host status
        .route("/status", get(routes::status::status))

        // Training
        .route("/train", post(routes::train::submit))
        .route("/train/:id", get(routes::train::get_job))

        // Tools
        .route("/tools/get_audio", get(routes::tools::get_audio))

        // Health check
        .route("/health", get(routes::health::health_check))

        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.metrics),
            access_log,
        ))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid));

    let origins = &state.config.origins;
    let router = if origins.is_empty() {
        router
    } else {
        warn!("CORS allow_origins={:?}. If you don't want this, modify the config", origins);
        router.layer(cors_layer(origins))
    };

    router.with_state(state)
}

/// Voice server
pub struct TtsServer {
    state: Arc<ServerState>,
}

impl TtsServer {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    /// Run the server until ctrl-c
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address();
        let router = create_router(Arc::clone(&self.state));

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TtsError::Io {
                message: format!("Failed to bind {}: {}", addr, e),
                path: None,
            })?;
        info!("Server listening on http://{}", addr);
        match self.state.config.text_limit() {
            Some(limit) => info!("Input text length limit: {}", limit),
            None => info!("Input text length is unlimited"),
        }

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TtsError::Io {
            message: format!("Server error: {}", e),
            path: None,
        })?;

        info!("Server stopped");
        Ok(())
    }

    /// Get server state
    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
