//! Inference capability contract
//!
//! The neural network, its text front-end and the BERT feature extractor
//! live behind these traits. The server only needs to turn a bundle into
//! a loaded model and ask that model for audio.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::audio::SynthesizedAudio;
use crate::core::error::Result;
use crate::model::BundleSpec;
use crate::synthesis::SynthesisParams;

/// A loaded voice model, ready to infer
#[async_trait]
pub trait VoiceModel: Send + Sync {
    /// Synthesize speech for one resolved request
    async fn infer(&self, request: &InferenceRequest) -> Result<SynthesizedAudio>;
}

/// Materializes bundles into loaded models
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Read weights, config and style vectors onto the bundle's device.
    /// This is the expensive step of a cold synthesis.
    async fn load(&self, spec: &BundleSpec) -> Result<Arc<dyn VoiceModel>>;

    /// Accelerators visible to the inference runtime
    async fn devices(&self) -> Result<DeviceInventory> {
        Ok(DeviceInventory::default())
    }
}

/// One inference call: selection plus the full parameter set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceRequest {
    pub speaker_id: i64,
    pub style: String,
    #[serde(flatten)]
    pub params: SynthesisParams,
}

/// Devices reported by the inference runtime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceInventory {
    /// Device names such as `cuda:0`
    #[serde(default)]
    pub devices: Vec<String>,
    #[serde(default)]
    pub gpus: Vec<GpuInfo>,
}

/// GPU utilization snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuInfo {
    pub gpu_id: u32,
    pub gpu_load: f32,
    pub gpu_memory: GpuMemory,
}

/// GPU memory in MB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuMemory {
    pub total: f64,
    pub used: f64,
    pub free: f64,
}
