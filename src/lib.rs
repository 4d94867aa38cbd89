//! # SDKWork-Voice - Multi-Model Voice Server
//!
//! Serves any number of trained Style-Bert-VITS2 voice models over HTTP.
//!
//! ## Features
//!
//! - **Model Registry**: bundles discovered on disk, refreshable without restart
//! - **Lazy Loading**: weights are read on the first request that needs them
//! - **Request Resolution**: model/speaker by name or id, with style validation
//! - **Training Submission**: one sample + transcript becomes a dataset and a detached training run
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌──────────────────┐
//! │ /voice query │──>│ RequestResolver│──>│ SynthesisPipeline│──> WAV
//! └──────────────┘   └───────┬────────┘   └────────┬─────────┘
//!                            │ snapshot            │ ensure_loaded
//!                    ┌───────▼────────┐   ┌────────▼─────────┐
//!                    │   ModelCache   │──>│   ModelLoader    │
//!                    └───────▲────────┘   └──────────────────┘
//!                            │ rebuild
//!                    ┌───────┴────────┐
//!                    │ ModelRegistry  │  <assets_root>/<model>/
//!                    └────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sdkwork_voice::engine::{WorkerConfig, WorkerLoader};
//! use sdkwork_voice::server::{ServerConfig, ServerState, TtsServer};
//! use sdkwork_voice::training::SystemLauncher;
//!
//! let config = ServerConfig::load("config.yml")?;
//! let loader = Arc::new(WorkerLoader::new(&config.worker)?);
//! let state = Arc::new(ServerState::new(config, loader, Arc::new(SystemLauncher)));
//! state.bootstrap()?;
//! TtsServer::new(state).run().await?;
//! ```

pub mod audio;
pub mod core;
pub mod engine;
pub mod model;
pub mod server;
pub mod synthesis;
pub mod training;

// Core re-exports
pub use self::core::error::{InferenceStage, ResolveError, Result, TrainingStage, TtsError};

// Model re-exports
pub use model::{Device, Generation, ModelBundle, ModelCache, ModelRegistry};

// Synthesis re-exports
pub use synthesis::{
    Language, ModelQuery, RequestResolver, ResolvedRequest, SynthesisParams, SynthesisPipeline,
};

// Engine re-exports
pub use engine::{ModelLoader, VoiceModel, WorkerLoader};

// Training re-exports
pub use training::{TrainingJobLauncher, TrainingUpload};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
