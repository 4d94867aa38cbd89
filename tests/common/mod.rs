//! Shared fixtures: on-disk bundle trees and fake collaborators

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use sdkwork_voice::audio::SynthesizedAudio;
use sdkwork_voice::engine::{InferenceRequest, ModelLoader, VoiceModel};
use sdkwork_voice::model::{BundleSpec, CONFIG_FILE, STYLE_VECTORS_FILE};
use sdkwork_voice::{InferenceStage, Result, TtsError};

pub const SAMPLE_RATE: u32 = 44100;

/// Config with speakers nao=0, sou=1 and styles Neutral, Happy
pub const TWO_SPEAKER_CONFIG: &str = r#"{
    "data": {
        "sampling_rate": 44100,
        "spk2id": {"nao": 0, "sou": 1},
        "style2id": {"Neutral": 0, "Happy": 1},
        "num_styles": 2
    }
}"#;

/// Write a complete bundle directory under `root`
pub fn write_bundle(root: &Path, name: &str) {
    write_bundle_with_config(root, name, TWO_SPEAKER_CONFIG);
}

pub fn write_bundle_with_config(root: &Path, name: &str, config: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{}_e100_s1000.safetensors", name)), b"weights").unwrap();
    fs::write(dir.join(CONFIG_FILE), config).unwrap();
    fs::write(dir.join(STYLE_VECTORS_FILE), b"npy").unwrap();
}

/// Model returning a fixed tone and remembering what it was asked
pub struct FakeModel {
    pub spec: BundleSpec,
    pub requests: Mutex<Vec<InferenceRequest>>,
    pub fail: bool,
}

#[async_trait]
impl VoiceModel for FakeModel {
    async fn infer(&self, request: &InferenceRequest) -> Result<SynthesizedAudio> {
        self.requests.lock().push(request.clone());
        if self.fail {
            return Err(TtsError::Inference {
                stage: InferenceStage::WorkerRequest,
                message: "decoder exploded".to_string(),
            });
        }
        let samples = (0..SAMPLE_RATE / 10)
            .map(|i| (i as f32 * 0.05).sin() * 0.5)
            .collect();
        Ok(SynthesizedAudio::new(SAMPLE_RATE, samples))
    }
}

/// Loader counting how often the expensive load runs
#[derive(Default)]
pub struct CountingLoader {
    pub loads: AtomicUsize,
    pub fail_next: AtomicBool,
    pub fail_inference: bool,
    pub delay: Duration,
    pub models: Mutex<Vec<Arc<FakeModel>>>,
}

impl CountingLoader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Default::default()
        })
    }

    pub fn failing_inference() -> Arc<Self> {
        Arc::new(Self {
            fail_inference: true,
            ..Default::default()
        })
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Every request seen by every model this loader produced
    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.models
            .lock()
            .iter()
            .flat_map(|m| m.requests.lock().clone())
            .collect()
    }
}

#[async_trait]
impl ModelLoader for CountingLoader {
    async fn load(&self, spec: &BundleSpec) -> Result<Arc<dyn VoiceModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TtsError::Inference {
                stage: InferenceStage::ModelLoad,
                message: "out of device memory".to_string(),
            });
        }

        let model = Arc::new(FakeModel {
            spec: spec.clone(),
            requests: Mutex::new(Vec::new()),
            fail: self.fail_inference,
        });
        self.models.lock().push(Arc::clone(&model));
        Ok(model)
    }
}
