//! Model Cache
//!
//! Holds the currently servable generation of bundles. A generation is an
//! immutable snapshot; refresh builds a new one and swaps the pointer, so a
//! request that captured a bundle keeps using it after the swap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::core::error::{ResolveError, Result, TtsError};
use crate::engine::{ModelLoader, VoiceModel};
use super::bundle::{Device, DiscoveredBundle, LoadState, ModelBundle};
use super::registry::ModelRegistry;

/// One immutable snapshot of the servable bundles, in index order
#[derive(Debug)]
pub struct Generation {
    number: u64,
    bundles: Vec<Arc<ModelBundle>>,
}

impl Generation {
    fn build(number: u64, discovered: Vec<DiscoveredBundle>, device: Device) -> Self {
        let bundles = discovered
            .into_iter()
            .enumerate()
            .map(|(index, bundle)| Arc::new(ModelBundle::new(index, number, bundle, device)))
            .collect();
        Self { number, bundles }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<ModelBundle>> {
        self.bundles.get(index)
    }

    pub fn bundles(&self) -> &[Arc<ModelBundle>] {
        &self.bundles
    }

    /// Indices of every bundle carrying `name`
    pub fn indices_named(&self, name: &str) -> Vec<usize> {
        self.bundles
            .iter()
            .filter(|b| b.name() == name)
            .map(|b| b.index())
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.bundles.iter().map(|b| b.name()).collect()
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub generation: u64,
    pub models: usize,
    pub loaded: usize,
}

/// Owner of the current generation and of lazy weight loading
pub struct ModelCache {
    current: RwLock<Arc<Generation>>,
    loader: Arc<dyn ModelLoader>,
    device: Device,
    next_generation: AtomicU64,
}

impl ModelCache {
    /// Create a cache with an empty generation 0
    pub fn new(loader: Arc<dyn ModelLoader>, device: Device) -> Self {
        Self {
            current: RwLock::new(Arc::new(Generation::build(0, Vec::new(), device))),
            loader,
            device,
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn loader(&self) -> &Arc<dyn ModelLoader> {
        &self.loader
    }

    /// Current generation. Holders keep it alive across refreshes.
    pub fn snapshot(&self) -> Arc<Generation> {
        Arc::clone(&self.current.read())
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the whole servable list. No weights are loaded.
    pub fn rebuild(&self, discovered: Vec<DiscoveredBundle>) -> Arc<Generation> {
        let number = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let generation = Arc::new(Generation::build(number, discovered, self.device));

        let previous = {
            let mut current = self.current.write();
            std::mem::replace(&mut *current, Arc::clone(&generation))
        };

        info!(
            "Model cache rebuilt: generation {} -> {} ({} models)",
            previous.number(),
            generation.number(),
            generation.len()
        );
        generation
    }

    /// Rescan `registry` and rebuild. A failed scan keeps the current generation.
    pub fn refresh_from(&self, registry: &ModelRegistry) -> Result<Arc<Generation>> {
        let discovered = registry.refresh().map_err(|e| {
            warn!("Model refresh failed, keeping current generation: {}", e);
            e
        })?;
        if discovered.is_empty() {
            warn!("Model refresh found no models in {:?}", registry.root());
        }
        Ok(self.rebuild(discovered))
    }

    /// Bundle at `index` in the current generation
    pub fn get(&self, index: usize) -> std::result::Result<Arc<ModelBundle>, ResolveError> {
        self.current
            .read()
            .get(index)
            .cloned()
            .ok_or(ResolveError::ModelIdNotFound(index as i64))
    }

    /// Materialize the bundle's weights if still unloaded.
    ///
    /// Concurrent first calls share a single load; later calls return the
    /// resident model without touching disk. A failed load leaves the
    /// bundle unloaded.
    pub async fn ensure_loaded(&self, bundle: &ModelBundle) -> Result<Arc<dyn VoiceModel>> {
        let model = bundle
            .model_cell()
            .get_or_try_init(|| async {
                let start = Instant::now();
                info!("Loading model {} onto {}", bundle.name(), bundle.device());
                let model = self.loader.load(&bundle.spec()).await.map_err(|e| {
                    TtsError::ModelLoad {
                        message: e.to_string(),
                        model: bundle.name().to_string(),
                        path: Some(bundle.paths().weights.clone()),
                    }
                })?;
                info!(
                    "Model {} loaded in {:.2}s",
                    bundle.name(),
                    start.elapsed().as_secs_f32()
                );
                Ok::<_, TtsError>(model)
            })
            .await?;

        Ok(Arc::clone(model))
    }

    pub fn stats(&self) -> CacheStats {
        let generation = self.snapshot();
        CacheStats {
            generation: generation.number(),
            models: generation.len(),
            loaded: generation
                .bundles()
                .iter()
                .filter(|b| b.load_state() == LoadState::Loaded)
                .count(),
        }
    }
}
