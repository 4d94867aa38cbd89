//! Synthesis pipeline
//!
//! resolve -> ensure_loaded -> infer, with inference gated per device so
//! concurrent requests queue instead of contending for the accelerator.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::audio::SynthesizedAudio;
use crate::core::error::{ResolveError, Result, TtsError};
use crate::engine::InferenceRequest;
use crate::model::ModelCache;
use super::params::SynthesisParams;
use super::resolver::{ModelQuery, RequestResolver, ResolvedRequest};

/// Orchestrates one synthesis call against the model cache
pub struct SynthesisPipeline {
    cache: Arc<ModelCache>,
    gate: Arc<Semaphore>,
}

impl SynthesisPipeline {
    /// `max_concurrent` is clamped to at least one permit
    pub fn new(cache: Arc<ModelCache>, max_concurrent: usize) -> Self {
        Self {
            cache,
            gate: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    /// Resolve against the current generation
    pub fn resolve(&self, query: &ModelQuery) -> std::result::Result<ResolvedRequest, ResolveError> {
        let generation = self.cache.snapshot();
        RequestResolver::resolve(&generation, query)
    }

    /// Run inference for an already resolved request.
    ///
    /// The first call against a cold bundle pays the load cost.
    pub async fn synthesize(
        &self,
        resolved: &ResolvedRequest,
        params: &SynthesisParams,
    ) -> Result<SynthesizedAudio> {
        let _permit = self.gate.acquire().await.map_err(|_| TtsError::Internal {
            message: "inference gate closed".to_string(),
            location: Some("SynthesisPipeline::synthesize".to_string()),
        })?;

        let model = self.cache.ensure_loaded(&resolved.bundle).await?;

        let request = InferenceRequest {
            speaker_id: resolved.speaker_id,
            style: resolved.style.clone(),
            params: params.clone(),
        };

        let start = Instant::now();
        let audio = model.infer(&request).await?;
        debug!(
            "Inference on {} took {:.2}s",
            resolved.bundle.name(),
            start.elapsed().as_secs_f32()
        );

        info!(
            "Synthesized {:.2}s of audio with model={} speaker_id={} style={}",
            audio.duration(),
            resolved.bundle.name(),
            resolved.speaker_id,
            resolved.style
        );
        Ok(audio)
    }

    /// Resolve and synthesize in one step
    pub async fn run(&self, query: &ModelQuery, params: &SynthesisParams) -> Result<SynthesizedAudio> {
        let resolved = self.resolve(query)?;
        self.synthesize(&resolved, params).await
    }

    /// Permits currently free
    pub fn available_permits(&self) -> usize {
        self.gate.available_permits()
    }
}
